use rpgmaster::dice::{roll_expression, DiceExpr, DiceLimits, RandomRoller, ScriptedRoller};
use rpgmaster::error::RpgError;

#[test]
fn scripted_two_d6_plus_three() {
    let mut dice = ScriptedRoller::new([4, 2]);
    let roll = roll_expression("2d6+3", &DiceLimits::default(), &mut dice).unwrap();
    assert_eq!(roll.rolls, vec![4, 2]);
    assert_eq!(roll.modifier, 3);
    assert_eq!(roll.total, 9);
    assert_eq!(roll.expr.to_string(), "2d6+3");
}

#[test]
fn random_rolls_stay_in_range() {
    let mut dice = RandomRoller::seeded(7);
    for _ in 0..200 {
        let roll = roll_expression("3d8+2", &DiceLimits::default(), &mut dice).unwrap();
        assert_eq!(roll.rolls.len(), 3);
        assert!(roll.rolls.iter().all(|r| (1..=8).contains(r)));
        let sum: u64 = roll.rolls.iter().map(|r| u64::from(*r)).sum();
        assert_eq!(roll.total, sum + 2);
    }
}

#[test]
fn malformed_expressions_have_no_result() {
    let limits = DiceLimits::default();
    let mut dice = ScriptedRoller::new([6]);
    for bad in ["", "abc", "20", "1d", "d20", "1d20+", "1d20-2", "1 d 20"] {
        assert!(
            matches!(
                roll_expression(bad, &limits, &mut dice),
                Err(RpgError::InvalidExpression(_))
            ),
            "{bad:?} should be rejected"
        );
    }
}

#[test]
fn caps_are_enforced() {
    let limits = DiceLimits {
        max_count: 10,
        max_sides: 100,
    };
    assert!(DiceExpr::parse_with_limits("10d100", &limits).is_ok());
    assert!(DiceExpr::parse_with_limits("11d6", &limits).is_err());
    assert!(DiceExpr::parse_with_limits("1d101", &limits).is_err());
    assert!(DiceExpr::parse_with_limits("99999999999d6", &limits).is_err());
}
