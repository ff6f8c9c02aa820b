//! Outbound message model: an embed-like [`Reply`] the transport renders.
use std::fmt::Write as _;

use crate::error::RpgError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyColor {
    Blue,
    Green,
    Gold,
    Purple,
    Orange,
    Red,
    Grey,
}

impl ReplyColor {
    /// RGB value as used by embed-style platforms.
    pub fn rgb(&self) -> u32 {
        match self {
            ReplyColor::Blue => 0x3498db,
            ReplyColor::Green => 0x2ecc71,
            ReplyColor::Gold => 0xf1c40f,
            ReplyColor::Purple => 0x9b59b6,
            ReplyColor::Orange => 0xe67e22,
            ReplyColor::Red => 0xe74c3c,
            ReplyColor::Grey => 0x95a5a6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<ReplyField>,
    pub color: ReplyColor,
    pub footer: Option<String>,
    pub thumbnail: Option<String>,
    /// Set when this reply replaces a failed command's normal reply.
    pub error: bool,
}

impl Reply {
    pub fn new(title: impl Into<String>, color: ReplyColor) -> Self {
        Self {
            title: Some(title.into()),
            description: None,
            fields: Vec::new(),
            color,
            footer: None,
            thumbnail: None,
            error: false,
        }
    }

    /// Plain text message with no title or fields.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            title: None,
            description: Some(text.into()),
            fields: Vec::new(),
            color: ReplyColor::Grey,
            footer: None,
            thumbnail: None,
            error: false,
        }
    }

    /// User-facing reply for a failed command. Store failures never leak their detail.
    pub fn from_error(err: &RpgError) -> Self {
        let text = match err {
            RpgError::InvalidExpression(_) => {
                "❌ Invalid format! Use: 1d20, 2d6+3, 4d8+2".to_string()
            }
            RpgError::InvalidInput(msg) => format!("❌ {msg}"),
            RpgError::NotFound { id } => format!("❌ Sheet #{id} not found in this server."),
            RpgError::Persistence(_) | RpgError::StartupFatal(_) => {
                "⚠️ Something went wrong saving or loading your data. Please try again later."
                    .to_string()
            }
        };
        let mut reply = Self::plain(text);
        reply.color = ReplyColor::Red;
        reply.error = true;
        reply
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(ReplyField {
            name: name.into(),
            value: value.into(),
            inline: false,
        });
        self
    }

    pub fn inline(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(ReplyField {
            name: name.into(),
            value: value.into(),
            inline: true,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    pub fn thumbnail(mut self, url: Option<String>) -> Self {
        self.thumbnail = url;
        self
    }

    /// Value of the first field called `name`.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Flatten into console text. Consecutive inline fields share one line.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if let Some(title) = &self.title {
            let _ = writeln!(out, "== {title} ==");
        }
        if let Some(desc) = &self.description {
            let _ = writeln!(out, "{desc}");
        }
        let mut inline_run: Vec<String> = Vec::new();
        for field in &self.fields {
            if field.inline {
                inline_run.push(format!("{}: {}", field.name, field.value));
                continue;
            }
            if !inline_run.is_empty() {
                let _ = writeln!(out, "{}", inline_run.join(" | "));
                inline_run.clear();
            }
            let _ = writeln!(out, "{}:", field.name);
            for line in field.value.lines() {
                let _ = writeln!(out, "  {line}");
            }
        }
        if !inline_run.is_empty() {
            let _ = writeln!(out, "{}", inline_run.join(" | "));
        }
        if let Some(footer) = &self.footer {
            let _ = writeln!(out, "-- {footer}");
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_inline_runs_on_one_line() {
        let reply = Reply::new("🎲 Dice Roll", ReplyColor::Blue)
            .description("@Aria rolled **2d6+3**")
            .field("Results", "[4, 2]")
            .inline("Modifier", "+3")
            .inline("Total", "**9**")
            .footer("May the dice be in your favor!");
        assert_eq!(
            reply.render_text(),
            "== 🎲 Dice Roll ==\n@Aria rolled **2d6+3**\nResults:\n  [4, 2]\nModifier: +3 | Total: **9**\n-- May the dice be in your favor!"
        );
        assert_eq!(reply.field_value("Total"), Some("**9**"));
    }

    #[test]
    fn persistence_detail_is_hidden() {
        let reply = Reply::from_error(&RpgError::Persistence("disk I/O error at /secret".into()));
        assert!(reply.error);
        assert!(!reply.render_text().contains("/secret"));

        let reply = Reply::from_error(&RpgError::NotFound { id: 9 });
        assert_eq!(reply.render_text(), "❌ Sheet #9 not found in this server.");
    }

    #[test]
    fn plain_has_no_title() {
        let reply = Reply::plain("hello");
        assert!(reply.title.is_none());
        assert!(!reply.error);
        assert_eq!(reply.render_text(), "hello");
    }
}
