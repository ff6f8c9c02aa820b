//! Dice expressions of the form `<count>d<sides>[+<modifier>]`.
//!
//! Parsing is strict: every component must be a plain run of ASCII digits, the count and
//! the number of sides must be at least 1, and at most one `+` may appear. Anything else
//! is an [`RpgError::InvalidExpression`] and no partial roll is produced.
//!
//! Randomness comes from a [`DieRoller`]. Production code uses [`RandomRoller`]; tests and
//! replays use [`ScriptedRoller`], which hands out a fixed sequence of faces.
//!
//! ```
//! use rpgmaster::dice::{roll_expression, DiceLimits, ScriptedRoller};
//!
//! let mut dice = ScriptedRoller::new([4, 2]);
//! let roll = roll_expression("2d6+3", &DiceLimits::default(), &mut dice).unwrap();
//! assert_eq!(roll.rolls, vec![4, 2]);
//! assert_eq!(roll.total, 9);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{RpgError, RpgResult};

/// Source of uniformly distributed die faces.
pub trait DieRoller: Send {
    /// Sample one face in `1..=sides`. `sides` is always at least 1.
    fn roll_die(&mut self, sides: u32) -> u32;
}

/// Roller backed by a `StdRng`, either entropy-seeded or seeded explicitly.
pub struct RandomRoller {
    rng: StdRng,
}

impl RandomRoller {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible roller; the same seed always yields the same faces.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomRoller {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl DieRoller for RandomRoller {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.rng.gen_range(1..=sides.max(1))
    }
}

/// Roller that replays a fixed list of faces, cycling when exhausted.
///
/// Each face is clamped into `1..=sides` of the die being rolled, so a scripted 20 on a
/// d8 comes out as 8. An empty script always rolls 1.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRoller {
    script: Vec<u32>,
    pending: VecDeque<u32>,
}

impl ScriptedRoller {
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        let script: Vec<u32> = faces.into_iter().collect();
        Self {
            pending: script.iter().copied().collect(),
            script,
        }
    }
}

impl DieRoller for ScriptedRoller {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if self.pending.is_empty() {
            self.pending.extend(self.script.iter().copied());
        }
        let face = self.pending.pop_front().unwrap_or(1);
        face.clamp(1, sides.max(1))
    }
}

/// Upper bounds applied while parsing so a single request cannot roll a million dice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceLimits {
    pub max_count: u32,
    pub max_sides: u32,
}

impl Default for DiceLimits {
    fn default() -> Self {
        Self {
            max_count: 100,
            max_sides: 1000,
        }
    }
}

/// A parsed `NdM+K` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceExpr {
    pub count: u32,
    pub sides: u32,
    pub modifier: u32,
}

impl DiceExpr {
    pub fn new(count: u32, sides: u32, modifier: u32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// Parse and enforce `limits`.
    pub fn parse_with_limits(input: &str, limits: &DiceLimits) -> RpgResult<Self> {
        let expr: DiceExpr = input.parse()?;
        if expr.count > limits.max_count {
            return Err(RpgError::InvalidExpression(format!(
                "at most {} dice per roll",
                limits.max_count
            )));
        }
        if expr.sides > limits.max_sides {
            return Err(RpgError::InvalidExpression(format!(
                "dice may have at most {} sides",
                limits.max_sides
            )));
        }
        Ok(expr)
    }

    /// Roll every die and add the modifier.
    pub fn roll(&self, dice: &mut dyn DieRoller) -> DiceRoll {
        let rolls: Vec<u32> = (0..self.count).map(|_| dice.roll_die(self.sides)).collect();
        let total = rolls.iter().map(|&r| u64::from(r)).sum::<u64>() + u64::from(self.modifier);
        DiceRoll {
            expr: *self,
            rolls,
            modifier: self.modifier,
            total,
        }
    }
}

fn parse_component(raw: &str, what: &str, input: &str) -> RpgResult<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RpgError::InvalidExpression(format!(
            "'{input}': {what} must be a whole number"
        )));
    }
    raw.parse::<u32>()
        .map_err(|_| RpgError::InvalidExpression(format!("'{input}': {what} is too large")))
}

impl FromStr for DiceExpr {
    type Err = RpgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(RpgError::InvalidExpression("empty expression".into()));
        }

        let (dice_part, modifier) = match input.split_once('+') {
            Some((dice, raw_mod)) => (dice, parse_component(raw_mod, "modifier", input)?),
            None => (input, 0),
        };

        let Some((raw_count, raw_sides)) = dice_part.split_once(['d', 'D']) else {
            return Err(RpgError::InvalidExpression(format!(
                "'{input}': missing 'd' separator (try 1d20 or 2d6+3)"
            )));
        };
        let count = parse_component(raw_count, "dice count", input)?;
        let sides = parse_component(raw_sides, "number of sides", input)?;

        if count == 0 {
            return Err(RpgError::InvalidExpression(format!(
                "'{input}': roll at least one die"
            )));
        }
        if sides == 0 {
            return Err(RpgError::InvalidExpression(format!(
                "'{input}': a die needs at least one side"
            )));
        }
        Ok(DiceExpr::new(count, sides, modifier))
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        if self.modifier > 0 {
            write!(f, "+{}", self.modifier)?;
        }
        Ok(())
    }
}

/// Outcome of rolling a [`DiceExpr`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceRoll {
    pub expr: DiceExpr,
    pub rolls: Vec<u32>,
    pub modifier: u32,
    pub total: u64,
}

/// Parse `input` under `limits` and roll it.
pub fn roll_expression(
    input: &str,
    limits: &DiceLimits,
    dice: &mut dyn DieRoller,
) -> RpgResult<DiceRoll> {
    let expr = DiceExpr::parse_with_limits(input, limits)?;
    Ok(expr.roll(dice))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_modified_expressions() {
        assert_eq!("1d20".parse::<DiceExpr>().unwrap(), DiceExpr::new(1, 20, 0));
        assert_eq!("2d6+3".parse::<DiceExpr>().unwrap(), DiceExpr::new(2, 6, 3));
        assert_eq!(" 4D8+0 ".parse::<DiceExpr>().unwrap(), DiceExpr::new(4, 8, 0));
    }

    #[test]
    fn rejects_malformed_expressions() {
        let bad = [
            "", "   ", "d6", "2d", "26", "2x6", "two d6", "2d6+", "2d6+x", "2d6+1+1", "-1d6",
            "2d6-1", "2d-6", "0d6", "3d0", "1d6+ 2", "99999999999d6",
        ];
        for input in bad {
            match input.parse::<DiceExpr>() {
                Err(RpgError::InvalidExpression(_)) => {}
                other => panic!("expected InvalidExpression for {input:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn limits_are_enforced() {
        let limits = DiceLimits {
            max_count: 10,
            max_sides: 100,
        };
        assert!(DiceExpr::parse_with_limits("10d100", &limits).is_ok());
        assert!(matches!(
            DiceExpr::parse_with_limits("11d6", &limits),
            Err(RpgError::InvalidExpression(_))
        ));
        assert!(matches!(
            DiceExpr::parse_with_limits("1d101", &limits),
            Err(RpgError::InvalidExpression(_))
        ));
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(DiceExpr::new(2, 6, 3).to_string(), "2d6+3");
        assert_eq!(DiceExpr::new(1, 20, 0).to_string(), "1d20");
    }

    #[test]
    fn scripted_roller_cycles_and_clamps() {
        let mut dice = ScriptedRoller::new([3, 25]);
        assert_eq!(dice.roll_die(20), 3);
        assert_eq!(dice.roll_die(20), 20);
        assert_eq!(dice.roll_die(6), 3);
        assert_eq!(ScriptedRoller::default().roll_die(6), 1);
    }

    #[test]
    fn seeded_rollers_agree() {
        let mut a = RandomRoller::seeded(7);
        let mut b = RandomRoller::seeded(7);
        let expr = DiceExpr::new(5, 12, 1);
        assert_eq!(expr.roll(&mut a), expr.roll(&mut b));
    }

    #[test]
    fn random_totals_stay_in_range() {
        let mut dice = RandomRoller::seeded(42);
        for (count, sides, modifier) in [(1, 1, 0), (3, 6, 2), (10, 20, 5), (100, 4, 0)] {
            let roll = DiceExpr::new(count, sides, modifier).roll(&mut dice);
            assert_eq!(roll.rolls.len(), count as usize);
            assert!(roll.rolls.iter().all(|&r| (1..=sides).contains(&r)));
            let sum: u64 = roll.rolls.iter().map(|&r| u64::from(r)).sum();
            assert_eq!(roll.total, sum + u64::from(modifier));
        }
    }
}
