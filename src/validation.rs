//! Input validation for sheet fields and command arguments.
//!
//! Every value that ends up in the store passes through here first. Failures are
//! reported as [`RpgError::InvalidInput`] with a message short enough to show the user.

use crate::error::{RpgError, RpgResult};

pub const MAX_LEVEL: i32 = 20;
pub const MIN_ABILITY: i32 = 1;
pub const MAX_ABILITY: i32 = 30;
/// Hard ceiling on stored hit points; keeps arithmetic far away from `i32` limits.
pub const MAX_HIT_POINTS: i32 = 10_000;
pub const MAX_FREE_TEXT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Name,
    Class,
    Race,
    System,
}

impl LabelKind {
    fn max_chars(&self) -> usize {
        match self {
            LabelKind::Name => 64,
            LabelKind::Class | LabelKind::Race => 32,
            LabelKind::System => 40,
        }
    }

    fn what(&self) -> &'static str {
        match self {
            LabelKind::Name => "character name",
            LabelKind::Class => "class",
            LabelKind::Race => "race",
            LabelKind::System => "system name",
        }
    }
}

/// Names, classes and the like: non-blank, no control characters, bounded length.
pub fn validate_label(kind: LabelKind, value: &str) -> RpgResult<()> {
    let what = kind.what();
    if value.trim().is_empty() {
        return Err(RpgError::InvalidInput(format!("{what} cannot be empty")));
    }
    if value.trim() != value {
        return Err(RpgError::InvalidInput(format!(
            "{what} cannot start or end with spaces"
        )));
    }
    if value.chars().count() > kind.max_chars() {
        return Err(RpgError::InvalidInput(format!(
            "{what} is too long (max {} characters)",
            kind.max_chars()
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(RpgError::InvalidInput(format!(
            "{what} contains control characters"
        )));
    }
    Ok(())
}

pub fn validate_level(level: i32) -> RpgResult<()> {
    if !(1..=MAX_LEVEL).contains(&level) {
        return Err(RpgError::InvalidInput(format!(
            "level must be between 1 and {MAX_LEVEL}"
        )));
    }
    Ok(())
}

pub fn validate_ability_score(label: &str, score: i32) -> RpgResult<()> {
    if !(MIN_ABILITY..=MAX_ABILITY).contains(&score) {
        return Err(RpgError::InvalidInput(format!(
            "{label} must be between {MIN_ABILITY} and {MAX_ABILITY}"
        )));
    }
    Ok(())
}

pub fn validate_hit_points(label: &str, value: i32, min: i32) -> RpgResult<()> {
    if !(min..=MAX_HIT_POINTS).contains(&value) {
        return Err(RpgError::InvalidInput(format!(
            "{label} must be between {min} and {MAX_HIT_POINTS}"
        )));
    }
    Ok(())
}

/// Damage and healing amounts: zero or positive, bounded.
pub fn validate_amount(amount: i32) -> RpgResult<()> {
    if amount < 0 {
        return Err(RpgError::InvalidInput("amount cannot be negative".into()));
    }
    if amount > MAX_HIT_POINTS {
        return Err(RpgError::InvalidInput(format!(
            "amount cannot exceed {MAX_HIT_POINTS}"
        )));
    }
    Ok(())
}

/// Free text echoed back to the channel (narration actions, attack targets).
/// Trims, rejects blanks and strips control characters other than newlines.
pub fn sanitize_free_text(raw: &str) -> RpgResult<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c == '\n' || !c.is_control())
        .collect();
    if cleaned.is_empty() {
        return Err(RpgError::InvalidInput("text cannot be empty".into()));
    }
    if cleaned.chars().count() > MAX_FREE_TEXT {
        let truncated: String = cleaned.chars().take(MAX_FREE_TEXT).collect();
        return Ok(format!("{truncated}…"));
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        assert!(validate_label(LabelKind::Name, "Aria Stormwind").is_ok());
        assert!(validate_label(LabelKind::Name, "Ária").is_ok());
        assert!(validate_label(LabelKind::Name, "").is_err());
        assert!(validate_label(LabelKind::Name, " Aria").is_err());
        assert!(validate_label(LabelKind::Class, "Ma\u{7}ge").is_err());
        assert!(validate_label(LabelKind::Race, &"x".repeat(33)).is_err());
    }

    #[test]
    fn numeric_ranges() {
        assert!(validate_level(1).is_ok());
        assert!(validate_level(21).is_err());
        assert!(validate_ability_score("STR", 0).is_err());
        assert!(validate_ability_score("STR", 30).is_ok());
        assert!(validate_hit_points("max HP", 0, 1).is_err());
        assert!(validate_amount(-1).is_err());
        assert!(validate_amount(0).is_ok());
    }

    #[test]
    fn free_text_is_cleaned() {
        assert_eq!(sanitize_free_text("  open the door\t ").unwrap(), "open the door");
        assert_eq!(sanitize_free_text("a\u{1b}[31mb").unwrap(), "a[31mb");
        assert!(sanitize_free_text("   ").is_err());
        let long = sanitize_free_text(&"z".repeat(500)).unwrap();
        assert!(long.ends_with('…'));
        assert_eq!(long.chars().count(), MAX_FREE_TEXT + 1);
    }
}
