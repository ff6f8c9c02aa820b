//! Text command parsing: `<prefix><name> [args]` into a typed [`BotCommand`].
//!
//! A chat platform hands over typed slash-command parameters; the console transport only
//! has a line of text, so this parser plays the platform's part. Lines without the prefix
//! are ordinary chatter and parse to `None`. Arguments are whitespace separated, double
//! quotes group words (`name="Aria Storm"`), and `create-sheet` also takes `key=value`.
use log::trace;

use crate::error::{RpgError, RpgResult};
use crate::storage::{Ability, NewSheet};

/// Identity of the user issuing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl UserRef {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
        }
    }

    pub fn mention(&self) -> String {
        format!("@{}", self.display_name)
    }
}

/// A parsed command plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub user: UserRef,
    pub server_id: String,
    pub channel_id: String,
    pub command: BotCommand,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BotCommand {
    Roll {
        expression: String,
    },
    Help {
        topic: Option<String>,
    },
    StartSession {
        system: Option<String>,
    },
    EndSession,
    CreateSheet(NewSheet),
    ListSheets,
    ViewSheet {
        id: i64,
    },
    DeleteSheet {
        id: i64,
    },
    Initiative {
        modifier: i32,
    },
    Attack {
        target: String,
        ability_modifier: i32,
        proficiency: i32,
    },
    Damage {
        sheet_id: i64,
        amount: i32,
        damage_type: Option<String>,
    },
    Heal {
        sheet_id: i64,
        amount: i32,
    },
    Narrate {
        action: String,
    },
}

impl BotCommand {
    /// Canonical command name, used in logs and help.
    pub fn name(&self) -> &'static str {
        match self {
            BotCommand::Roll { .. } => "roll",
            BotCommand::Help { .. } => "help",
            BotCommand::StartSession { .. } => "start-session",
            BotCommand::EndSession => "end-session",
            BotCommand::CreateSheet(_) => "create-sheet",
            BotCommand::ListSheets => "list-sheets",
            BotCommand::ViewSheet { .. } => "view-sheet",
            BotCommand::DeleteSheet { .. } => "delete-sheet",
            BotCommand::Initiative { .. } => "initiative",
            BotCommand::Attack { .. } => "attack",
            BotCommand::Damage { .. } => "damage",
            BotCommand::Heal { .. } => "heal",
            BotCommand::Narrate { .. } => "narrate",
        }
    }
}

/// Default proficiency bonus for `attack` when none is given.
pub const DEFAULT_PROFICIENCY: i32 = 2;

pub struct CommandParser {
    prefix: String,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `None` for text that is not a command; otherwise the command or why it is invalid.
    pub fn parse(&self, raw: &str) -> Option<RpgResult<BotCommand>> {
        let trimmed = raw.trim();
        let body = trimmed.strip_prefix(self.prefix.as_str())?;
        let (name, rest) = match body.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (body, ""),
        };
        if name.is_empty() {
            return None;
        }
        let normalized = name.to_ascii_lowercase().replace('_', "-");
        let parsed = self.parse_named(&normalized, rest);
        trace!("Parsed '{}' as {:?}", normalized, parsed.as_ref().map(BotCommand::name));
        Some(parsed)
    }

    fn parse_named(&self, name: &str, rest: &str) -> RpgResult<BotCommand> {
        let p = &self.prefix;
        match name {
            "roll" | "r" => {
                let expression: String = rest.split_whitespace().collect();
                if expression.is_empty() {
                    return Err(usage(format!("{p}roll 2d6+3")));
                }
                Ok(BotCommand::Roll { expression })
            }
            "help" | "h" | "?" => Ok(BotCommand::Help {
                topic: non_empty(rest),
            }),
            "start-session" | "startsession" | "session" => Ok(BotCommand::StartSession {
                system: non_empty(rest),
            }),
            "end-session" | "endsession" => Ok(BotCommand::EndSession),
            "create-sheet" | "createsheet" | "sheet" => {
                parse_create_sheet(&tokenize(rest)?).map(BotCommand::CreateSheet)
            }
            "list-sheets" | "listsheets" | "sheets" => Ok(BotCommand::ListSheets),
            "view-sheet" | "viewsheet" | "view" => Ok(BotCommand::ViewSheet {
                id: single_id(rest, &format!("{p}view-sheet <id>"))?,
            }),
            "delete-sheet" | "deletesheet" => Ok(BotCommand::DeleteSheet {
                id: single_id(rest, &format!("{p}delete-sheet <id>"))?,
            }),
            "initiative" | "init" => {
                let modifier = match non_empty(rest) {
                    Some(raw) => parse_int(&raw, "modifier")?,
                    None => 0,
                };
                Ok(BotCommand::Initiative { modifier })
            }
            "attack" | "atk" => parse_attack(&tokenize(rest)?, p),
            "damage" | "dmg" => {
                let tokens = tokenize(rest)?;
                if tokens.len() < 2 {
                    return Err(usage(format!("{p}damage <sheet id> <amount> [type]")));
                }
                let damage_type = non_empty(&tokens[2..].join(" "));
                Ok(BotCommand::Damage {
                    sheet_id: parse_int(&tokens[0], "sheet id")?,
                    amount: parse_int(&tokens[1], "amount")?,
                    damage_type,
                })
            }
            "heal" => {
                let tokens = tokenize(rest)?;
                if tokens.len() != 2 {
                    return Err(usage(format!("{p}heal <sheet id> <amount>")));
                }
                Ok(BotCommand::Heal {
                    sheet_id: parse_int(&tokens[0], "sheet id")?,
                    amount: parse_int(&tokens[1], "amount")?,
                })
            }
            "narrate" | "narrar" => match non_empty(rest) {
                Some(action) => Ok(BotCommand::Narrate { action }),
                None => Err(usage(format!("{p}narrate <what your character does>"))),
            },
            other => Err(RpgError::InvalidInput(format!(
                "unknown command '{other}'; try {p}help"
            ))),
        }
    }
}

fn usage(example: String) -> RpgError {
    RpgError::InvalidInput(format!("usage: {example}"))
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

fn parse_int<T: std::str::FromStr>(raw: &str, what: &str) -> RpgResult<T> {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    digits
        .parse::<T>()
        .map_err(|_| RpgError::InvalidInput(format!("{what} must be a whole number, got '{raw}'")))
}

fn single_id(rest: &str, example: &str) -> RpgResult<i64> {
    let raw = rest.trim().trim_start_matches('#');
    if raw.is_empty() || raw.contains(char::is_whitespace) {
        return Err(usage(example.to_string()));
    }
    parse_int(raw, "sheet id")
}

/// Split on whitespace, keeping double-quoted runs together (quotes removed).
fn tokenize(input: &str) -> RpgResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if in_quotes {
        return Err(RpgError::InvalidInput("unclosed quote".into()));
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_create_sheet(tokens: &[String]) -> RpgResult<NewSheet> {
    let mut sheet = NewSheet::new("", "");
    let mut positional = 0usize;
    for token in tokens {
        let (key, value) = match token.split_once('=') {
            Some((k, v)) => (k.to_ascii_lowercase(), v.to_string()),
            None => {
                let key = match positional {
                    0 => "name",
                    1 => "class",
                    2 => "level",
                    3 => "race",
                    _ => {
                        return Err(RpgError::InvalidInput(format!(
                            "unexpected argument '{token}'; use key=value for abilities"
                        )))
                    }
                };
                positional += 1;
                (key.to_string(), token.clone())
            }
        };
        match key.as_str() {
            "name" => sheet.name = value,
            "class" => sheet.class = value,
            "race" => sheet.race = Some(value),
            "level" | "lvl" => sheet.level = Some(parse_int(&value, "level")?),
            "hp" | "max_hp" | "maxhp" => sheet.max_hp = Some(parse_int(&value, "max HP")?),
            other => match Ability::from_key(other) {
                Some(ability) => sheet
                    .abilities
                    .set(ability, parse_int(&value, ability.short())?),
                None => {
                    return Err(RpgError::InvalidInput(format!(
                        "unknown sheet field '{other}'"
                    )))
                }
            },
        }
    }
    if sheet.name.is_empty() || sheet.class.is_empty() {
        return Err(usage(
            "create-sheet <name> <class> [level] [race] [str=10 dex=10 con=10 int=10 wis=10 cha=10]"
                .to_string(),
        ));
    }
    Ok(sheet)
}

fn parse_attack(tokens: &[String], p: &str) -> RpgResult<BotCommand> {
    let is_int = |t: &String| parse_int::<i32>(t, "").is_ok();
    let trailing = tokens.iter().rev().take(2).take_while(|t| is_int(*t)).count();
    let split = tokens.len() - trailing;
    let target = tokens[..split].join(" ");
    if target.trim().is_empty() {
        return Err(usage(format!(
            "{p}attack <target> [strength mod] [proficiency]"
        )));
    }
    let numbers: Vec<i32> = tokens[split..]
        .iter()
        .map(|t| parse_int(t, "bonus"))
        .collect::<RpgResult<_>>()?;
    let (ability_modifier, proficiency) = match numbers.as_slice() {
        [m, p] => (*m, *p),
        [m] => (*m, DEFAULT_PROFICIENCY),
        _ => (0, DEFAULT_PROFICIENCY),
    };
    Ok(BotCommand::Attack {
        target,
        ability_modifier,
        proficiency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Option<RpgResult<BotCommand>> {
        CommandParser::new("/").parse(raw)
    }

    fn ok(raw: &str) -> BotCommand {
        match parse(raw) {
            Some(Ok(cmd)) => cmd,
            other => panic!("expected command for {raw:?}, got {other:?}"),
        }
    }

    #[test]
    fn ignores_plain_chat() {
        assert!(parse("hello there").is_none());
        assert!(parse("/").is_none());
        assert!(parse("").is_none());
    }

    #[test]
    fn roll_joins_spaces() {
        assert_eq!(
            ok("/roll 2d6 + 3"),
            BotCommand::Roll {
                expression: "2d6+3".into()
            }
        );
        assert_eq!(ok("/R 1d20").name(), "roll");
        assert!(matches!(parse("/roll"), Some(Err(RpgError::InvalidInput(_)))));
    }

    #[test]
    fn underscores_and_case_normalize() {
        assert_eq!(ok("/LIST_SHEETS"), BotCommand::ListSheets);
        assert_eq!(ok("/view-sheet #4"), BotCommand::ViewSheet { id: 4 });
        assert!(parse("/view-sheet four").unwrap().is_err());
    }

    #[test]
    fn create_sheet_positional_and_keyed() {
        let cmd = ok(r#"/create-sheet "Aria Storm" Mage con=14 DEX=12 race=Elf"#);
        let BotCommand::CreateSheet(sheet) = cmd else {
            panic!("expected create-sheet");
        };
        assert_eq!(sheet.name, "Aria Storm");
        assert_eq!(sheet.class, "Mage");
        assert_eq!(sheet.abilities.constitution, 14);
        assert_eq!(sheet.abilities.dexterity, 12);
        assert_eq!(sheet.race(), "Elf");
        assert_eq!(sheet.level(), 1);

        let BotCommand::CreateSheet(sheet) = ok("/sheet Borin Fighter 3 Dwarf") else {
            panic!("expected create-sheet");
        };
        assert_eq!((sheet.level(), sheet.race()), (3, "Dwarf"));

        assert!(parse("/create-sheet Aria").unwrap().is_err());
        assert!(parse("/create-sheet Aria Mage luck=3").unwrap().is_err());
        assert!(parse(r#"/create-sheet "Aria Mage"#).unwrap().is_err());
    }

    #[test]
    fn attack_peels_trailing_numbers() {
        assert_eq!(
            ok("/attack goblin chief 3 4"),
            BotCommand::Attack {
                target: "goblin chief".into(),
                ability_modifier: 3,
                proficiency: 4
            }
        );
        assert_eq!(
            ok("/attack orc -1"),
            BotCommand::Attack {
                target: "orc".into(),
                ability_modifier: -1,
                proficiency: DEFAULT_PROFICIENCY
            }
        );
        assert!(parse("/attack 3").unwrap().is_err());
    }

    #[test]
    fn damage_heal_initiative() {
        assert_eq!(
            ok("/damage 7 12 cold iron"),
            BotCommand::Damage {
                sheet_id: 7,
                amount: 12,
                damage_type: Some("cold iron".into())
            }
        );
        assert_eq!(ok("/heal 7 +5"), BotCommand::Heal { sheet_id: 7, amount: 5 });
        assert!(parse("/heal 7").unwrap().is_err());
        assert_eq!(ok("/init +3"), BotCommand::Initiative { modifier: 3 });
        assert_eq!(ok("/initiative"), BotCommand::Initiative { modifier: 0 });
    }

    #[test]
    fn unknown_command_is_invalid() {
        assert!(matches!(
            parse("/teleport home"),
            Some(Err(RpgError::InvalidInput(_)))
        ));
    }

    #[test]
    fn custom_prefix() {
        let parser = CommandParser::new("!");
        assert!(parser.parse("/roll 1d6").is_none());
        assert!(matches!(parser.parse("!roll 1d6"), Some(Ok(BotCommand::Roll { .. }))));
    }
}
