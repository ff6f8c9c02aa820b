//! Command execution: one [`Invocation`] in, one [`Reply`] out.
//!
//! Every command returns `RpgResult<Reply>`; [`CommandHandler::handle`] is the boundary that
//! turns an error into a user-facing reply and logs it. Store failures are logged with
//! the command, user and scope; the user only sees a generic message.

use chrono::Utc;
use log::{debug, error, info, warn};

use crate::combat::{roll_attack, roll_initiative};
use crate::dice::roll_expression;
use crate::error::{RpgError, RpgResult};
use crate::logutil::escape_log;
use crate::narration::narrate;
use crate::storage::{Ability, CharacterSheet, NewSession, NewSheet};
use crate::validation::{sanitize_free_text, validate_label, LabelKind};

use super::commands::{BotCommand, Invocation};
use super::context::BotContext;
use super::help;
use super::reply::{Reply, ReplyColor};

/// Field cap for list replies, matching the embed limit of common chat platforms.
const MAX_LIST_FIELDS: usize = 25;

pub struct CommandHandler;

impl CommandHandler {
    /// Execute `inv`. Never fails: errors become an error reply.
    pub async fn handle(ctx: &BotContext, inv: &Invocation) -> Reply {
        info!(
            "{} ({}) ran {} in {}/{}",
            escape_log(&inv.user.display_name),
            escape_log(&inv.user.id),
            inv.command.name(),
            escape_log(&inv.server_id),
            escape_log(&inv.channel_id)
        );
        match Self::dispatch(ctx, inv).await {
            Ok(reply) => reply,
            Err(e) => {
                if e.is_user_error() {
                    debug!(
                        "{} rejected for {}: {}",
                        inv.command.name(),
                        escape_log(&inv.user.id),
                        e
                    );
                } else {
                    error!(
                        "{} failed for user={} server={} channel={}: {}",
                        inv.command.name(),
                        escape_log(&inv.user.id),
                        escape_log(&inv.server_id),
                        escape_log(&inv.channel_id),
                        e
                    );
                }
                Reply::from_error(&e)
            }
        }
    }

    async fn dispatch(ctx: &BotContext, inv: &Invocation) -> RpgResult<Reply> {
        match &inv.command {
            BotCommand::Roll { expression } => Self::roll(ctx, inv, expression),
            BotCommand::Help { topic } => Ok(match topic {
                Some(t) => help::topic(t, ctx.prefix()),
                None => help::overview(ctx.prefix()),
            }),
            BotCommand::StartSession { system } => {
                Self::start_session(ctx, inv, system.as_deref()).await
            }
            BotCommand::EndSession => Self::end_session(ctx, inv).await,
            BotCommand::CreateSheet(sheet) => Self::create_sheet(ctx, inv, sheet.clone()).await,
            BotCommand::ListSheets => Self::list_sheets(ctx, inv).await,
            BotCommand::ViewSheet { id } => Self::view_sheet(ctx, inv, *id).await,
            BotCommand::DeleteSheet { id } => Self::delete_sheet(ctx, inv, *id).await,
            BotCommand::Initiative { modifier } => Ok(Self::initiative(ctx, inv, *modifier)),
            BotCommand::Attack {
                target,
                ability_modifier,
                proficiency,
            } => Self::attack(ctx, inv, target, *ability_modifier, *proficiency),
            BotCommand::Damage {
                sheet_id,
                amount,
                damage_type,
            } => Self::damage(ctx, inv, *sheet_id, *amount, damage_type.as_deref()).await,
            BotCommand::Heal { sheet_id, amount } => {
                Self::heal(ctx, inv, *sheet_id, *amount).await
            }
            BotCommand::Narrate { action } => Self::narrate(ctx, action),
        }
    }

    fn roll(ctx: &BotContext, inv: &Invocation, expression: &str) -> RpgResult<Reply> {
        let limits = ctx.dice_limits();
        let roll = ctx.with_dice(|dice| roll_expression(expression, &limits, dice))?;
        let rolls: Vec<String> = roll.rolls.iter().map(u32::to_string).collect();
        let modifier = if roll.modifier > 0 {
            format!("+{}", roll.modifier)
        } else {
            "0".to_string()
        };
        Ok(Reply::new("🎲 Dice Roll", ReplyColor::Blue)
            .description(format!("{} rolled **{}**", inv.user.mention(), roll.expr))
            .field("Results", format!("[{}]", rolls.join(", ")))
            .inline("Modifier", modifier)
            .inline("Total", format!("**{}**", roll.total))
            .footer("May the dice be in your favor!"))
    }

    async fn start_session(
        ctx: &BotContext,
        inv: &Invocation,
        system: Option<&str>,
    ) -> RpgResult<Reply> {
        let system = system.unwrap_or(&ctx.config.bot.default_system);
        validate_label(LabelKind::System, system)?;
        let session = ctx
            .sessions
            .start(&inv.server_id, &inv.channel_id, &inv.user.id, system);
        if ctx.config.sessions.persist {
            let stored = ctx
                .store
                .create_session(NewSession {
                    session_key: session.key.clone(),
                    server_id: session.server_id.clone(),
                    channel_id: session.channel_id.clone(),
                    master_id: session.master_id.clone(),
                    system: session.system.clone(),
                    campaign_name: None,
                })
                .await;
            if let Err(e) = stored {
                ctx.sessions.remove(&session.key);
                return Err(e);
            }
        }
        Ok(Reply::new("🏰 New RPG Session!", ReplyColor::Gold)
            .description(format!("System: **{}**", session.system))
            .inline("Master", inv.user.mention())
            .inline("Status", "🟢 Ready for adventure!")
            .inline("Session ID", session.key)
            .footer(format!(
                "Use {}create-sheet to create your character!",
                ctx.prefix()
            )))
    }

    async fn end_session(ctx: &BotContext, inv: &Invocation) -> RpgResult<Reply> {
        let ended = ctx.sessions.end_channel(&inv.channel_id);
        let persisted = if ctx.config.sessions.persist {
            ctx.store.end_session(&inv.channel_id).await?
        } else {
            0
        };
        let Some(last) = ended.last() else {
            if persisted == 0 {
                return Ok(Reply::plain("There is no active session in this channel."));
            }
            return Ok(Reply::new("🏁 Session ended", ReplyColor::Gold)
                .description("The previous session in this channel has been closed."));
        };
        let minutes = (Utc::now() - last.started_at).num_minutes().max(0);
        let players = if last.players.is_empty() {
            "nobody joined".to_string()
        } else {
            last.players.len().to_string()
        };
        Ok(Reply::new("🏁 Session ended", ReplyColor::Gold)
            .description(format!("System: **{}**", last.system))
            .inline("Duration", format!("{minutes} min"))
            .inline("Players", players)
            .inline("Session ID", last.key.clone())
            .footer("Thanks for playing!"))
    }

    async fn create_sheet(ctx: &BotContext, inv: &Invocation, sheet: NewSheet) -> RpgResult<Reply> {
        let id = ctx
            .store
            .create_sheet(&inv.user.id, &inv.server_id, sheet)
            .await?;
        let sheet = ctx
            .store
            .get_sheet(&inv.user.id, &inv.server_id, id)
            .await?
            .ok_or(RpgError::NotFound { id })?;

        if ctx.sessions.join(&inv.channel_id, &inv.user.id) && ctx.config.sessions.persist {
            if let Err(e) = ctx
                .store
                .add_session_player(&inv.channel_id, &inv.user.id)
                .await
            {
                warn!("sheet #{id} created but session roster not updated: {e}");
            }
        }

        Ok(Reply::new("📋 Character Sheet Created", ReplyColor::Purple)
            .description(format!("**{}** (#{})", sheet.name, sheet.id))
            .inline("Class", sheet.class.clone())
            .inline("Level", sheet.level.to_string())
            .inline("Race", sheet.race.clone())
            .inline("Player", inv.user.mention())
            .inline("HP", sheet.hp_line())
            .inline("Proficiency", signed(sheet.proficiency_bonus()))
            .field("Abilities", ability_line(&sheet))
            .thumbnail(inv.user.avatar_url.clone())
            .footer(format!(
                "Use {}view-sheet {} to see the full sheet",
                ctx.prefix(),
                sheet.id
            )))
    }

    async fn list_sheets(ctx: &BotContext, inv: &Invocation) -> RpgResult<Reply> {
        let sheets = ctx.store.list_sheets(&inv.user.id, &inv.server_id).await?;
        let mut reply = Reply::new("📜 Your Characters", ReplyColor::Purple);
        if sheets.is_empty() {
            return Ok(reply.description(format!(
                "You have no characters in this server yet. Use {}create-sheet to make one.",
                ctx.prefix()
            )));
        }
        for sheet in sheets.iter().take(MAX_LIST_FIELDS) {
            reply = reply.field(
                format!("#{} {}", sheet.id, sheet.name),
                format!(
                    "Level {} {} {} · HP {}",
                    sheet.level,
                    sheet.race,
                    sheet.class,
                    sheet.hp_line()
                ),
            );
        }
        if sheets.len() > MAX_LIST_FIELDS {
            reply = reply.footer(format!("…and {} more", sheets.len() - MAX_LIST_FIELDS));
        }
        Ok(reply)
    }

    async fn view_sheet(ctx: &BotContext, inv: &Invocation, id: i64) -> RpgResult<Reply> {
        let sheet = ctx
            .store
            .get_sheet(&inv.user.id, &inv.server_id, id)
            .await?
            .ok_or(RpgError::NotFound { id })?;
        let mut reply = Reply::new(format!("📋 {}", sheet.name), ReplyColor::Purple)
            .description(format!(
                "Level {} {} {} (#{})",
                sheet.level, sheet.race, sheet.class, sheet.id
            ))
            .inline("HP", sheet.hp_line())
            .inline("XP", sheet.experience.to_string())
            .inline("Proficiency", signed(sheet.proficiency_bonus()));
        for ability in Ability::ALL {
            reply = reply.inline(
                ability.short(),
                format!(
                    "{} ({})",
                    sheet.abilities.score(ability),
                    signed(sheet.abilities.modifier(ability))
                ),
            );
        }
        reply = reply
            .field("Currency", render_currency(&sheet.currency))
            .field("Inventory", render_inventory(&sheet.inventory));
        if !sheet.notes.trim().is_empty() {
            reply = reply.field("Notes", sheet.notes.clone());
        }
        Ok(reply.footer(format!(
            "Created {} · Updated {}",
            sheet.created_at.format("%Y-%m-%d %H:%M"),
            sheet.updated_at.format("%Y-%m-%d %H:%M")
        )))
    }

    async fn delete_sheet(ctx: &BotContext, inv: &Invocation, id: i64) -> RpgResult<Reply> {
        if !ctx
            .store
            .delete_sheet(id, &inv.user.id, &inv.server_id)
            .await?
        {
            return Err(RpgError::NotFound { id });
        }
        Ok(Reply::plain(format!("🗑️ Sheet #{id} deleted.")))
    }

    fn initiative(ctx: &BotContext, inv: &Invocation, modifier: i32) -> Reply {
        let roll = ctx.with_dice(|dice| roll_initiative(dice, modifier));
        Reply::new("⚡ Initiative", ReplyColor::Gold)
            .description(format!("{} rolls initiative", inv.user.mention()))
            .inline("d20", roll.die.to_string())
            .inline("Modifier", signed(roll.modifier))
            .inline("Total", format!("**{}**", roll.total))
            .footer(roll.pace.flavor())
    }

    fn attack(
        ctx: &BotContext,
        inv: &Invocation,
        target: &str,
        ability_modifier: i32,
        proficiency: i32,
    ) -> RpgResult<Reply> {
        let target = sanitize_free_text(target)?;
        let roll = ctx.with_dice(|dice| roll_attack(dice, ability_modifier, proficiency));
        let outcome = if roll.critical {
            "💥 CRITICAL HIT!"
        } else if roll.fumble {
            "💀 Critical miss"
        } else if roll.hit {
            "✅ Hit!"
        } else {
            "❌ Miss"
        };
        let damage = if roll.hit {
            let base = format!(
                "d8 ({}) {} = **{}**",
                roll.damage_die,
                signed(roll.ability_modifier),
                roll.damage
            );
            if roll.critical {
                format!("{base} (doubled)")
            } else {
                base
            }
        } else {
            "—".to_string()
        };
        Ok(Reply::new(format!("⚔️ Attack on {target}"), ReplyColor::Orange)
            .description(format!("{} attacks!", inv.user.mention()))
            .field(
                "Attack roll",
                format!(
                    "d20 ({}) {} {} = **{}**",
                    roll.attack_die,
                    signed(roll.ability_modifier),
                    signed(roll.proficiency),
                    roll.attack_total
                ),
            )
            .inline("Result", outcome)
            .inline("Damage", damage))
    }

    async fn damage(
        ctx: &BotContext,
        inv: &Invocation,
        sheet_id: i64,
        amount: i32,
        damage_type: Option<&str>,
    ) -> RpgResult<Reply> {
        let damage_type = damage_type.map(sanitize_free_text).transpose()?;
        let change = ctx
            .store
            .apply_damage(&inv.user.id, &inv.server_id, sheet_id, amount)
            .await?;
        let kind = damage_type.map(|t| format!(" {t}")).unwrap_or_default();
        let mut reply = Reply::new("💔 Damage taken", ReplyColor::Red)
            .description(format!("**{}** takes {amount}{kind} damage", change.name))
            .inline(
                "HP",
                format!("{} → {} / {}", change.before, change.after, change.max_hp),
            );
        if change.is_down() {
            reply = reply.field("Status", format!("💀 {} is down!", change.name));
        }
        Ok(reply)
    }

    async fn heal(ctx: &BotContext, inv: &Invocation, sheet_id: i64, amount: i32) -> RpgResult<Reply> {
        let change = ctx
            .store
            .apply_healing(&inv.user.id, &inv.server_id, sheet_id, amount)
            .await?;
        Ok(Reply::new("💚 Healing", ReplyColor::Green)
            .description(format!("**{}** recovers {} HP", change.name, change.applied()))
            .inline(
                "HP",
                format!("{} → {} / {}", change.before, change.after, change.max_hp),
            ))
    }

    fn narrate(ctx: &BotContext, action: &str) -> RpgResult<Reply> {
        let action = sanitize_free_text(action)?;
        let line = ctx.with_dice(narrate);
        Ok(Reply::new("🎭 Player Action", ReplyColor::Orange)
            .description(format!("*{action}*"))
            .field("Narration", line)
            .footer(format!(
                "RPG Master • Use {}roll to decide the outcome",
                ctx.prefix()
            )))
    }
}

fn signed(n: i32) -> String {
    if n >= 0 {
        format!("+{n}")
    } else {
        n.to_string()
    }
}

fn ability_line(sheet: &CharacterSheet) -> String {
    Ability::ALL
        .iter()
        .map(|a| {
            format!(
                "{} {} ({})",
                a.short(),
                sheet.abilities.score(*a),
                signed(sheet.abilities.modifier(*a))
            )
        })
        .collect::<Vec<_>>()
        .join(" · ")
}

fn render_currency(value: &serde_json::Value) -> String {
    match value.as_object() {
        Some(coins) if !coins.is_empty() => coins
            .iter()
            .map(|(coin, amount)| format!("{coin} {amount}"))
            .collect::<Vec<_>>()
            .join(" · "),
        _ => "none".to_string(),
    }
}

fn render_inventory(value: &serde_json::Value) -> String {
    match value.as_array() {
        Some(items) if !items.is_empty() => items
            .iter()
            .map(|item| match item.as_str() {
                Some(s) => format!("• {s}"),
                None => format!("• {item}"),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => "empty".to_string(),
    }
}
