//! Static help: the command overview and a few rules topics.

use super::reply::{Reply, ReplyColor};

/// Topic text by lowercase key. `classes` also answers to `class`.
pub fn topic_text(topic: &str, prefix: &str) -> Option<String> {
    let text = match topic.trim().to_lowercase().as_str() {
        "combat" => format!(
            "⚔️ **Combat**: action, movement, attack. Roll initiative with {prefix}initiative <dex mod>, then {prefix}attack <target>."
        ),
        "spells" => "🔮 **Spells**: every class has its own spell list. Wizards cast with Intelligence, clerics with Wisdom.".to_string(),
        "dice" => format!("🎲 **Dice**: use {prefix}roll XdY+Z. Examples: 1d20, 2d6+3, 1d8+2"),
        "classes" | "class" => "📖 **Classes**: Fighter, Wizard, Cleric, Rogue, Barbarian and more.".to_string(),
        "d&d" | "dnd" => "🐉 **D&D 5e**: the default system. Strength, Dexterity, Constitution, Intelligence, Wisdom, Charisma.".to_string(),
        _ => return None,
    };
    Some(text)
}

pub fn overview(prefix: &str) -> Reply {
    let p = prefix;
    Reply::new("📚 RPG Master Help", ReplyColor::Green)
        .description("Available commands:")
        .field(format!("{p}roll <dice>"), format!("Example: {p}roll 2d20+5"))
        .field(format!("{p}start-session [system]"), "Start a new adventure in this channel")
        .field(format!("{p}end-session"), "Close the channel's session")
        .field(
            format!("{p}create-sheet <name> <class> [level] [race] [str=.. dex=.. con=.. int=.. wis=.. cha=..]"),
            "Create your character",
        )
        .field(format!("{p}list-sheets · {p}view-sheet <id> · {p}delete-sheet <id>"), "Manage your characters")
        .field(format!("{p}initiative [mod]"), "Roll initiative: d20 + modifier")
        .field(format!("{p}attack <target> [str mod] [proficiency]"), "Attack roll plus d8 damage")
        .field(format!("{p}damage <id> <amount> [type] · {p}heal <id> <amount>"), "Track hit points")
        .field(format!("{p}narrate <action>"), "Ask the master to narrate what you do")
        .field(format!("{p}help [topic]"), format!("Topics: combat, spells, dice, classes, d&d. Example: {p}help combat"))
}

pub fn topic(topic: &str, prefix: &str) -> Reply {
    match topic_text(topic, prefix) {
        Some(text) => Reply::plain(text),
        None => Reply::plain(format!("📖 Topic '{}' is still being written!", topic.trim())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_are_case_insensitive() {
        assert!(topic_text("COMBAT", "/").unwrap().contains("/initiative"));
        assert!(topic_text("D&D", "!").is_some());
        assert_eq!(topic_text("class", "/"), topic_text("classes", "/"));
    }

    #[test]
    fn unknown_topic_is_not_an_error() {
        let reply = topic("psionics", "/");
        assert!(!reply.error);
        assert!(reply.render_text().contains("psionics"));
    }

    #[test]
    fn overview_uses_prefix() {
        let text = overview("!").render_text();
        assert!(text.contains("!roll <dice>"));
        assert!(!text.contains("/roll"));
    }
}
