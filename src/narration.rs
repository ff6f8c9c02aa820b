//! Narration lines for the `narrate` command.
//!
//! Behavior:
//! - Stateless: no persistence; one line picked uniformly from a fixed pool
//! - The pick goes through a [`DieRoller`] so replays with a scripted roller are exact

use crate::dice::DieRoller;

/// Fixed narration pool.
pub const LINES: [&str; 5] = [
    "You press forward bravely...",
    "As you act, you notice that...",
    "The dice reveal that...",
    "A mysterious aura surrounds your movements...",
    "Fate seems to be on your side...",
];

/// Pick a narration line: roll a die with one face per line.
pub fn narrate(dice: &mut dyn DieRoller) -> &'static str {
    let face = dice.roll_die(LINES.len() as u32) as usize;
    LINES[face.clamp(1, LINES.len()) - 1]
}
