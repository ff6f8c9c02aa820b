//! Character sheet records and the typed create/update requests that feed the store.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use crate::error::{RpgError, RpgResult};
use crate::validation::{
    validate_ability_score, validate_hit_points, validate_label, validate_level, LabelKind,
};

pub const DEFAULT_NAME: &str = "Unnamed";
pub const DEFAULT_CLASS: &str = "Adventurer";
pub const DEFAULT_RACE: &str = "Human";
pub const DEFAULT_ABILITY: i32 = 10;
pub const DEFAULT_CURRENCY: &str = r#"{"gp":0,"sp":0,"ep":0,"cp":0}"#;
pub const DEFAULT_INVENTORY: &str = "[]";

/// Ability-score modifier: `(score - 10) div 2`, rounding toward negative infinity.
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// `10 + con modifier + (level - 1) * 6`.
pub fn starting_max_hp(constitution: i32, level: i32) -> i32 {
    10 + ability_modifier(constitution) + (level - 1) * 6
}

/// Proficiency bonus by level: +2 at 1-4, +3 at 5-8 and so on.
pub fn proficiency_bonus(level: i32) -> i32 {
    2 + (level.max(1) - 1) / 4
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub const ALL: [Ability; 6] = [
        Ability::Strength,
        Ability::Dexterity,
        Ability::Constitution,
        Ability::Intelligence,
        Ability::Wisdom,
        Ability::Charisma,
    ];

    pub fn short(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Ability::Strength => "strength",
            Ability::Dexterity => "dexterity",
            Ability::Constitution => "constitution",
            Ability::Intelligence => "intelligence",
            Ability::Wisdom => "wisdom",
            Ability::Charisma => "charisma",
        }
    }

    /// Accepts the three-letter abbreviation or the full name, any case.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.to_ascii_lowercase();
        Ability::ALL
            .into_iter()
            .find(|a| key == a.short().to_ascii_lowercase() || key == a.column())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abilities {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl Default for Abilities {
    fn default() -> Self {
        Self {
            strength: DEFAULT_ABILITY,
            dexterity: DEFAULT_ABILITY,
            constitution: DEFAULT_ABILITY,
            intelligence: DEFAULT_ABILITY,
            wisdom: DEFAULT_ABILITY,
            charisma: DEFAULT_ABILITY,
        }
    }
}

impl Abilities {
    pub fn score(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, ability: Ability, score: i32) {
        let slot = match ability {
            Ability::Strength => &mut self.strength,
            Ability::Dexterity => &mut self.dexterity,
            Ability::Constitution => &mut self.constitution,
            Ability::Intelligence => &mut self.intelligence,
            Ability::Wisdom => &mut self.wisdom,
            Ability::Charisma => &mut self.charisma,
        };
        *slot = score;
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.score(ability))
    }

    fn validate(&self) -> RpgResult<()> {
        for ability in Ability::ALL {
            validate_ability_score(ability.short(), self.score(ability))?;
        }
        Ok(())
    }
}

/// A persisted character sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterSheet {
    pub id: i64,
    pub owner_id: String,
    pub server_id: String,
    pub name: String,
    pub class: String,
    pub level: i32,
    pub race: String,
    pub abilities: Abilities,
    pub max_hp: i32,
    pub current_hp: i32,
    pub experience: i64,
    pub currency: serde_json::Value,
    pub inventory: serde_json::Value,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CharacterSheet {
    pub fn proficiency_bonus(&self) -> i32 {
        proficiency_bonus(self.level)
    }

    /// Compact `HP 7/12` style gauge.
    pub fn hp_line(&self) -> String {
        format!("{}/{}", self.current_hp, self.max_hp)
    }
}

/// Request to create a sheet. Omitted values fall back to the documented defaults:
/// level 1, race "Human", every ability 10, max HP from constitution and level,
/// current HP equal to max HP.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSheet {
    pub name: String,
    pub class: String,
    pub level: Option<i32>,
    pub race: Option<String>,
    pub abilities: Abilities,
    pub max_hp: Option<i32>,
    pub current_hp: Option<i32>,
}

impl Default for NewSheet {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            class: DEFAULT_CLASS.to_string(),
            level: None,
            race: None,
            abilities: Abilities::default(),
            max_hp: None,
            current_hp: None,
        }
    }
}

impl NewSheet {
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            ..Self::default()
        }
    }

    pub fn level(&self) -> i32 {
        self.level.unwrap_or(1)
    }

    pub fn race(&self) -> &str {
        self.race.as_deref().unwrap_or(DEFAULT_RACE)
    }

    /// `(max_hp, current_hp)` after defaults; current HP is clamped into `[0, max_hp]`.
    pub fn resolved_hp(&self) -> (i32, i32) {
        let max_hp = self
            .max_hp
            .unwrap_or_else(|| starting_max_hp(self.abilities.constitution, self.level()));
        let current = self.current_hp.unwrap_or(max_hp).clamp(0, max_hp.max(0));
        (max_hp, current)
    }

    pub fn validate(&self) -> RpgResult<()> {
        validate_label(LabelKind::Name, &self.name)?;
        validate_label(LabelKind::Class, &self.class)?;
        validate_label(LabelKind::Race, self.race())?;
        validate_level(self.level())?;
        self.abilities.validate()?;
        if let Some(max_hp) = self.max_hp {
            validate_hit_points("max HP", max_hp, 1)?;
        }
        if let Some(current) = self.current_hp {
            validate_hit_points("current HP", current, 0)?;
        }
        Ok(())
    }
}

/// Partial update restricted to the mutable columns of a sheet.
///
/// Only these fields can change through [`crate::storage::CampaignStore::update_sheet`];
/// identity, ownership, blobs and timestamps are never touched by it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetUpdate {
    pub name: Option<String>,
    pub class: Option<String>,
    pub level: Option<i32>,
    pub race: Option<String>,
    pub strength: Option<i32>,
    pub dexterity: Option<i32>,
    pub constitution: Option<i32>,
    pub intelligence: Option<i32>,
    pub wisdom: Option<i32>,
    pub charisma: Option<i32>,
    pub max_hp: Option<i32>,
    pub current_hp: Option<i32>,
    pub experience: Option<i64>,
}

impl SheetUpdate {
    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }

    pub fn set_ability(&mut self, ability: Ability, score: i32) {
        let slot = match ability {
            Ability::Strength => &mut self.strength,
            Ability::Dexterity => &mut self.dexterity,
            Ability::Constitution => &mut self.constitution,
            Ability::Intelligence => &mut self.intelligence,
            Ability::Wisdom => &mut self.wisdom,
            Ability::Charisma => &mut self.charisma,
        };
        *slot = Some(score);
    }

    pub fn validate(&self) -> RpgResult<()> {
        if let Some(name) = &self.name {
            validate_label(LabelKind::Name, name)?;
        }
        if let Some(class) = &self.class {
            validate_label(LabelKind::Class, class)?;
        }
        if let Some(race) = &self.race {
            validate_label(LabelKind::Race, race)?;
        }
        if let Some(level) = self.level {
            validate_level(level)?;
        }
        let abilities = [
            (Ability::Strength, self.strength),
            (Ability::Dexterity, self.dexterity),
            (Ability::Constitution, self.constitution),
            (Ability::Intelligence, self.intelligence),
            (Ability::Wisdom, self.wisdom),
            (Ability::Charisma, self.charisma),
        ];
        for (ability, score) in abilities {
            if let Some(score) = score {
                validate_ability_score(ability.short(), score)?;
            }
        }
        if let Some(max_hp) = self.max_hp {
            validate_hit_points("max HP", max_hp, 1)?;
        }
        if let Some(current) = self.current_hp {
            validate_hit_points("current HP", current, 0)?;
        }
        if matches!(self.experience, Some(xp) if xp < 0) {
            return Err(RpgError::InvalidInput("experience cannot be negative".into()));
        }
        Ok(())
    }

    /// Column/value pairs for every present field, in a fixed column order.
    pub(crate) fn assignments(&self) -> Vec<(&'static str, Value)> {
        let text = |v: &Option<String>| v.clone().map(Value::Text);
        let int = |v: Option<i32>| v.map(|n| Value::Integer(i64::from(n)));
        [
            ("name", text(&self.name)),
            ("class", text(&self.class)),
            ("level", int(self.level)),
            ("race", text(&self.race)),
            ("strength", int(self.strength)),
            ("dexterity", int(self.dexterity)),
            ("constitution", int(self.constitution)),
            ("intelligence", int(self.intelligence)),
            ("wisdom", int(self.wisdom)),
            ("charisma", int(self.charisma)),
            ("max_hp", int(self.max_hp)),
            ("current_hp", int(self.current_hp)),
            ("experience", self.experience.map(Value::Integer)),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.map(|v| (column, v)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_floor_toward_negative() {
        assert_eq!(ability_modifier(10), 0);
        assert_eq!(ability_modifier(11), 0);
        assert_eq!(ability_modifier(14), 2);
        assert_eq!(ability_modifier(9), -1);
        assert_eq!(ability_modifier(1), -5);
        assert_eq!(ability_modifier(30), 10);
    }

    #[test]
    fn max_hp_formula() {
        assert_eq!(starting_max_hp(14, 1), 12);
        assert_eq!(starting_max_hp(10, 3), 22);
        assert_eq!(starting_max_hp(8, 1), 9);
    }

    #[test]
    fn proficiency_by_level() {
        assert_eq!(proficiency_bonus(1), 2);
        assert_eq!(proficiency_bonus(4), 2);
        assert_eq!(proficiency_bonus(5), 3);
        assert_eq!(proficiency_bonus(20), 6);
    }

    #[test]
    fn new_sheet_defaults_and_hp() {
        let mut sheet = NewSheet::new("Aria", "Mage");
        sheet.abilities.constitution = 14;
        assert_eq!(sheet.level(), 1);
        assert_eq!(sheet.race(), "Human");
        assert_eq!(sheet.resolved_hp(), (12, 12));

        sheet.max_hp = Some(20);
        sheet.current_hp = Some(50);
        assert_eq!(sheet.resolved_hp(), (20, 20));
    }

    #[test]
    fn ability_keys() {
        assert_eq!(Ability::from_key("con"), Some(Ability::Constitution));
        assert_eq!(Ability::from_key("Wisdom"), Some(Ability::Wisdom));
        assert_eq!(Ability::from_key("luck"), None);
    }

    #[test]
    fn empty_update_has_no_assignments() {
        let update = SheetUpdate::default();
        assert!(update.is_empty());

        let mut update = SheetUpdate {
            level: Some(3),
            ..Default::default()
        };
        update.set_ability(Ability::Charisma, 16);
        let cols: Vec<_> = update.assignments().into_iter().map(|(c, _)| c).collect();
        assert_eq!(cols, vec!["level", "charisma"]);
    }

    #[test]
    fn validation_rejects_out_of_range() {
        let mut sheet = NewSheet::new("Aria", "Mage");
        sheet.level = Some(0);
        assert!(matches!(sheet.validate(), Err(RpgError::InvalidInput(_))));

        let mut sheet = NewSheet::new("", "Mage");
        assert!(sheet.validate().is_err());
        sheet.name = "Aria".into();
        sheet.abilities.strength = 31;
        assert!(sheet.validate().is_err());

        let update = SheetUpdate {
            experience: Some(-1),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
