//! Stateless combat rolls (initiative, attack) and the hit-point clamp shared with storage.
//!
//! There is no armor-class model: an attack hits on a natural 20 or when the attack total
//! reaches [`ATTACK_HIT_THRESHOLD`], and misses on a natural 1. The result is display-only.

use crate::dice::DieRoller;

/// Attack total needed to hit. Placeholder until targets carry an armor class.
pub const ATTACK_HIT_THRESHOLD: i32 = 15;
/// Initiative totals at or above this act first.
pub const INITIATIVE_FIRST_AT: i32 = 18;
/// Initiative totals at or below this act last.
pub const INITIATIVE_LAST_AT: i32 = 5;

const D20: u32 = 20;
const WEAPON_DIE: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitiativePace {
    First,
    Normal,
    Last,
}

impl InitiativePace {
    fn from_total(total: i32) -> Self {
        if total >= INITIATIVE_FIRST_AT {
            InitiativePace::First
        } else if total <= INITIATIVE_LAST_AT {
            InitiativePace::Last
        } else {
            InitiativePace::Normal
        }
    }

    pub fn flavor(&self) -> &'static str {
        match self {
            InitiativePace::First => "⚡ Lightning reflexes! You will likely act first.",
            InitiativePace::Normal => "⚔️ Ready for battle.",
            InitiativePace::Last => "🐢 Caught off guard... you will probably act last.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitiativeRoll {
    pub die: u32,
    pub modifier: i32,
    pub total: i32,
    pub pace: InitiativePace,
}

/// d20 + modifier.
pub fn roll_initiative(dice: &mut dyn DieRoller, modifier: i32) -> InitiativeRoll {
    let die = dice.roll_die(D20);
    let total = (die as i32).saturating_add(modifier);
    InitiativeRoll {
        die,
        modifier,
        total,
        pace: InitiativePace::from_total(total),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackRoll {
    pub attack_die: u32,
    pub ability_modifier: i32,
    pub proficiency: i32,
    pub attack_total: i32,
    pub critical: bool,
    pub fumble: bool,
    pub hit: bool,
    pub damage_die: u32,
    /// Final damage after the critical doubling, never negative.
    pub damage: i32,
}

/// Roll to hit (d20 + ability + proficiency) and, independently, damage (d8 + ability).
pub fn roll_attack(dice: &mut dyn DieRoller, ability_modifier: i32, proficiency: i32) -> AttackRoll {
    let attack_die = dice.roll_die(D20);
    let attack_total = (attack_die as i32)
        .saturating_add(ability_modifier)
        .saturating_add(proficiency);
    let critical = attack_die == D20;
    let fumble = attack_die == 1;
    let hit = critical || (!fumble && attack_total >= ATTACK_HIT_THRESHOLD);

    let damage_die = dice.roll_die(WEAPON_DIE);
    let base = (damage_die as i32).saturating_add(ability_modifier).max(0);
    let damage = if critical { base.saturating_mul(2) } else { base };

    AttackRoll {
        attack_die,
        ability_modifier,
        proficiency,
        attack_total,
        critical,
        fumble,
        hit,
        damage_die,
        damage,
    }
}

/// `current + delta` constrained to `[0, max_hp]`.
pub fn clamp_hp(current: i32, max_hp: i32, delta: i32) -> i32 {
    current.saturating_add(delta).clamp(0, max_hp.max(0))
}

/// Before/after view of a damage or healing application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HpChange {
    pub sheet_id: i64,
    pub name: String,
    pub before: i32,
    pub after: i32,
    pub max_hp: i32,
}

impl HpChange {
    /// Signed amount actually applied after clamping.
    pub fn applied(&self) -> i32 {
        self.after - self.before
    }

    pub fn is_down(&self) -> bool {
        self.after == 0
    }
}
