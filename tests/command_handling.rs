mod common;

use common::{invoke, scripted_context};
use rpgmaster::bot::{BotCommand, CommandHandler};
use rpgmaster::narration::LINES;
use rpgmaster::storage::NewSheet;

fn create_aria() -> BotCommand {
    let mut sheet = NewSheet::new("Aria", "Mage");
    sheet.abilities.constitution = 14;
    BotCommand::CreateSheet(sheet)
}

#[tokio::test]
async fn roll_reports_breakdown() {
    let (_tmp, ctx) = scripted_context([4, 2]).await;
    let reply = CommandHandler::handle(
        &ctx,
        &invoke("aria", BotCommand::Roll { expression: "2d6+3".into() }),
    )
    .await;
    assert!(!reply.error);
    assert_eq!(reply.field_value("Results"), Some("[4, 2]"));
    assert_eq!(reply.field_value("Modifier"), Some("+3"));
    assert_eq!(reply.field_value("Total"), Some("**9**"));
    assert!(reply.description.unwrap().contains("@Aria"));
}

#[tokio::test]
async fn bad_expression_becomes_error_reply() {
    let (_tmp, ctx) = scripted_context([1]).await;
    let reply = CommandHandler::handle(
        &ctx,
        &invoke("aria", BotCommand::Roll { expression: "2x6".into() }),
    )
    .await;
    assert!(reply.error);
    assert!(reply.render_text().contains("Invalid format"));
}

#[tokio::test]
async fn create_view_list_delete_flow() {
    let (_tmp, ctx) = scripted_context([10]).await;
    let created = CommandHandler::handle(&ctx, &invoke("aria", create_aria())).await;
    assert!(!created.error, "{}", created.render_text());
    assert_eq!(created.field_value("HP"), Some("12/12"));
    assert_eq!(created.field_value("Proficiency"), Some("+2"));
    assert_eq!(created.field_value("Race"), Some("Human"));

    let sheets = ctx.store.list_sheets("aria", common::SERVER).await.unwrap();
    assert_eq!(sheets.len(), 1);
    let id = sheets[0].id;

    let view = CommandHandler::handle(&ctx, &invoke("aria", BotCommand::ViewSheet { id })).await;
    assert_eq!(view.field_value("CON"), Some("14 (+2)"));
    assert_eq!(view.field_value("Inventory"), Some("empty"));

    let list = CommandHandler::handle(&ctx, &invoke("aria", BotCommand::ListSheets)).await;
    assert_eq!(list.fields.len(), 1);
    assert!(list.fields[0].name.contains("Aria"));

    let foreign = CommandHandler::handle(&ctx, &invoke("borin", BotCommand::ViewSheet { id })).await;
    assert!(foreign.error);
    assert!(foreign.render_text().contains(&format!("#{id}")));

    let denied = CommandHandler::handle(&ctx, &invoke("borin", BotCommand::DeleteSheet { id })).await;
    assert!(denied.error);

    let deleted = CommandHandler::handle(&ctx, &invoke("aria", BotCommand::DeleteSheet { id })).await;
    assert!(!deleted.error);
    let empty = CommandHandler::handle(&ctx, &invoke("aria", BotCommand::ListSheets)).await;
    assert!(empty.fields.is_empty());
}

#[tokio::test]
async fn damage_and_heal_replies() {
    let (_tmp, ctx) = scripted_context([10]).await;
    CommandHandler::handle(&ctx, &invoke("aria", create_aria())).await;
    let id = ctx.store.list_sheets("aria", common::SERVER).await.unwrap()[0].id;

    let hit = CommandHandler::handle(
        &ctx,
        &invoke(
            "aria",
            BotCommand::Damage {
                sheet_id: id,
                amount: 20,
                damage_type: Some("fire".into()),
            },
        ),
    )
    .await;
    assert_eq!(hit.field_value("HP"), Some("12 → 0 / 12"));
    assert!(hit.field_value("Status").unwrap().contains("down"));
    assert!(hit.description.unwrap().contains("20 fire damage"));

    let healed = CommandHandler::handle(
        &ctx,
        &invoke("aria", BotCommand::Heal { sheet_id: id, amount: 5 }),
    )
    .await;
    assert_eq!(healed.field_value("HP"), Some("0 → 5 / 12"));

    let negative = CommandHandler::handle(
        &ctx,
        &invoke("aria", BotCommand::Heal { sheet_id: id, amount: -1 }),
    )
    .await;
    assert!(negative.error);
}

#[tokio::test]
async fn critical_attack_doubles_damage() {
    let (_tmp, ctx) = scripted_context([20, 5]).await;
    let reply = CommandHandler::handle(
        &ctx,
        &invoke(
            "aria",
            BotCommand::Attack {
                target: "goblin".into(),
                ability_modifier: 3,
                proficiency: 2,
            },
        ),
    )
    .await;
    assert_eq!(reply.title.as_deref(), Some("⚔️ Attack on goblin"));
    assert_eq!(reply.field_value("Result"), Some("💥 CRITICAL HIT!"));
    assert!(reply.field_value("Damage").unwrap().contains("**16**"));
}

#[tokio::test]
async fn natural_one_misses() {
    let (_tmp, ctx) = scripted_context([1, 8]).await;
    let reply = CommandHandler::handle(
        &ctx,
        &invoke(
            "aria",
            BotCommand::Attack {
                target: "ogre".into(),
                ability_modifier: 20,
                proficiency: 6,
            },
        ),
    )
    .await;
    assert_eq!(reply.field_value("Result"), Some("💀 Critical miss"));
    assert_eq!(reply.field_value("Damage"), Some("—"));
}

#[tokio::test]
async fn initiative_and_narration() {
    let (_tmp, ctx) = scripted_context([17, 3]).await;
    let init = CommandHandler::handle(&ctx, &invoke("aria", BotCommand::Initiative { modifier: 2 })).await;
    assert_eq!(init.field_value("Total"), Some("**19**"));
    assert!(init.footer.unwrap().contains("act first"));

    let story = CommandHandler::handle(
        &ctx,
        &invoke("aria", BotCommand::Narrate { action: "I kick the door".into() }),
    )
    .await;
    assert_eq!(story.field_value("Narration"), Some(LINES[2]));
    assert_eq!(story.description.as_deref(), Some("*I kick the door*"));
}

#[tokio::test]
async fn help_overview_and_topics() {
    let (_tmp, ctx) = scripted_context([1]).await;
    let overview = CommandHandler::handle(&ctx, &invoke("aria", BotCommand::Help { topic: None })).await;
    assert!(overview.fields.iter().any(|f| f.name.starts_with("/roll")));

    let topic = CommandHandler::handle(
        &ctx,
        &invoke("aria", BotCommand::Help { topic: Some("Dice".into()) }),
    )
    .await;
    assert!(topic.render_text().contains("/roll XdY+Z"));
}

#[test]
fn handler_runs_on_a_plain_executor() {
    tokio_test::block_on(async {
        let (_tmp, ctx) = scripted_context([6]).await;
        let reply = CommandHandler::handle(
            &ctx,
            &invoke("aria", BotCommand::Roll { expression: "1d6".into() }),
        )
        .await;
        assert_eq!(reply.field_value("Total"), Some("**6**"));
    });
}
