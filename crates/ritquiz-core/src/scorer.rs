//! Ability update after each response.
//!
//! The step size depends on how the item's band relates to the ability
//! estimate *before* the update:
//!
//! | Difficulty | Correct | Incorrect |
//! |------------|---------|-----------|
//! | easy       | +5      | -15       |
//! | at_level   | +10     | -10       |
//! | hard       | +15     | -5        |

use serde::{Deserialize, Serialize};

use crate::model::{DifficultyClass, Rit, RitBand};

/// Result of scoring one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    /// Ability after applying `delta`.
    pub new_ability: Rit,
    /// Classification against the ability before the update.
    pub class: DifficultyClass,
    /// Signed change applied to the ability.
    pub delta: Rit,
}

/// Ability change for a response of the given class and correctness.
pub const fn adjustment(class: DifficultyClass, is_correct: bool) -> Rit {
    match (class, is_correct) {
        (DifficultyClass::Easy, true) => 5,
        (DifficultyClass::Easy, false) => -15,
        (DifficultyClass::AtLevel, true) => 10,
        (DifficultyClass::AtLevel, false) => -10,
        (DifficultyClass::Hard, true) => 15,
        (DifficultyClass::Hard, false) => -5,
    }
}

/// Score a response to an item with `band`, answered at `ability_before`.
///
/// Pure: the same inputs always give the same outcome. The result is not
/// clamped to any range; it only saturates at the limits of [`Rit`].
pub fn score(band: RitBand, ability_before: Rit, is_correct: bool) -> ScoreOutcome {
    let class = band.classify(ability_before);
    let delta = adjustment(class, is_correct);
    ScoreOutcome {
        new_ability: ability_before.saturating_add(delta),
        class,
        delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn band(low: Rit, high: Rit) -> RitBand {
        RitBand::new(low, high).unwrap()
    }

    #[test]
    fn correct_at_level() {
        let outcome = score(band(195, 205), 200, true);
        assert_eq!(outcome.class, DifficultyClass::AtLevel);
        assert_eq!(outcome.new_ability, 210);
    }

    #[test]
    fn correct_on_harder_item() {
        let outcome = score(band(210, 230), 200, true);
        assert_eq!(outcome.class, DifficultyClass::Hard);
        assert_eq!(outcome.new_ability, 215);
    }

    #[test]
    fn incorrect_on_easier_item() {
        let outcome = score(band(150, 190), 200, false);
        assert_eq!(outcome.class, DifficultyClass::Easy);
        assert_eq!(outcome.new_ability, 185);
    }

    #[test]
    fn classification_uses_ability_before_update() {
        // 204 is inside [195, 205); the +10 lands at 214, above the band,
        // but the class must still be at_level.
        let outcome = score(band(195, 205), 204, true);
        assert_eq!(outcome.class, DifficultyClass::AtLevel);
        assert_eq!(outcome.new_ability, 214);
    }

    #[test]
    fn adjustment_table() {
        assert_eq!(adjustment(DifficultyClass::Easy, true), 5);
        assert_eq!(adjustment(DifficultyClass::Easy, false), -15);
        assert_eq!(adjustment(DifficultyClass::AtLevel, true), 10);
        assert_eq!(adjustment(DifficultyClass::AtLevel, false), -10);
        assert_eq!(adjustment(DifficultyClass::Hard, true), 15);
        assert_eq!(adjustment(DifficultyClass::Hard, false), -5);
    }

    #[test]
    fn no_floor_or_ceiling() {
        let low = score(band(0, 10), -500, false);
        assert_eq!(low.new_ability, -505);
        let high = score(band(0, 10), 10_000, true);
        assert_eq!(high.new_ability, 10_005);
        let saturated = score(band(0, 10), Rit::MAX, true);
        assert_eq!(saturated.new_ability, Rit::MAX);
    }

    proptest! {
        #[test]
        fn classification_is_a_total_partition(
            low in -1000i32..1000,
            width in 1i32..200,
            ability in -2000i32..2000,
        ) {
            let b = band(low, low + width);
            let class = b.classify(ability);
            let hard = ability < b.low();
            let easy = ability >= b.high();
            let at_level = b.low() <= ability && ability < b.high();
            prop_assert_eq!([hard, at_level, easy].iter().filter(|&&x| x).count(), 1);
            prop_assert_eq!(class == DifficultyClass::AtLevel, at_level);
            prop_assert_eq!(class == DifficultyClass::Hard, hard);
            prop_assert_eq!(class == DifficultyClass::Easy, easy);
        }

        #[test]
        fn score_is_pure(
            low in -1000i32..1000,
            width in 1i32..200,
            ability in -2000i32..2000,
            correct: bool,
        ) {
            let b = band(low, low + width);
            let first = score(b, ability, correct);
            let second = score(b, ability, correct);
            prop_assert_eq!(first, second);
            prop_assert_eq!(first.new_ability, ability + first.delta);
            prop_assert_eq!(first.delta > 0, correct);
        }
    }
}
