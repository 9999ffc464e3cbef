//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a game produces identical results
//! given an identical seed and identical orders.
//!
//! # Testing Strategy
//!
//! Replays must be exact. Sources of non-determinism include:
//!
//! - **Floating-point math**: strengths and odds use fixed point via
//!   [`warband_core::math::Fixed`].
//!
//! - **HashMap iteration order**: units live in a `BTreeMap` and are
//!   processed in ascending id order.
//!
//! - **System randomness**: every draw comes from the game's seeded
//!   `ChaCha8Rng`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use warband_core::components::OwnerId;
use warband_core::game::Game;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of turns played per run.
    pub turns: u32,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic game).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the game was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Game is non-deterministic!\n\
                 Runs: {}\n\
                 Turns: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.turns,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state forward multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to replay
/// * `turns` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one turn
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    turns: u32,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..turns {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        turns,
    }
}

/// Play one full turn: every owner's AI acts in ascending owner order,
/// then the turn ends.
pub fn play_ai_turn(game: &mut Game) {
    let owners: Vec<OwnerId> = game.units().owners();
    for owner in owners {
        game.run_ai_turn(owner);
    }
    game.end_turn();
}

/// Hash the serialized unit registry of a game.
///
/// # Panics
///
/// Panics if the registry fails to serialize.
#[must_use]
pub fn game_hash(game: &Game) -> u64 {
    serialized_hash(game.units())
}

/// Hash the RON serialization of any value.
///
/// # Panics
///
/// Panics if the value fails to serialize.
#[must_use]
pub fn serialized_hash<T: Serialize>(value: &T) -> u64 {
    let text = ron::to_string(value).expect("state serializes");
    compute_hash(&text)
}

/// Compute a hash for any hashable value.
#[must_use]
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for combat properties.
pub mod strategies {
    use proptest::prelude::*;
    use warband_core::bonus::{Bonus, BonusSet};
    use warband_core::components::Category;
    use warband_core::map::{Feature, TileFeatures};
    use warband_core::math::Fixed;

    /// Base strengths seen in unit data (1-40).
    pub fn arb_strength() -> impl Strategy<Value = u32> {
        1u32..=40u32
    }

    /// Summed strength percentages, including values below the floor.
    pub fn arb_strength_percent() -> impl Strategy<Value = i32> {
        -200i32..=400i32
    }

    /// Health on the 0-100 scale, including out-of-range values.
    pub fn arb_health() -> impl Strategy<Value = u32> {
        0u32..=150u32
    }

    /// A positive modified strength.
    pub fn arb_modified_strength() -> impl Strategy<Value = Fixed> {
        (1i64..=4000i64).prop_map(|hundredths| Fixed::from_num(hundredths) / Fixed::from_num(100))
    }

    /// A strength-percent bonus kind.
    pub fn arb_percent_bonus() -> impl Strategy<Value = Bonus> {
        prop_oneof![
            Just(Bonus::Strength),
            Just(Bonus::AttackStrength),
            Just(Bonus::DefenseStrength),
            Just(Bonus::CityAttack),
            Just(Bonus::HillsDefense),
            Just(Bonus::VsMelee),
            Just(Bonus::VsMounted),
        ]
    }

    /// A bonus set built from up to `max_len` grants of 1-50 percent.
    pub fn arb_bonus_grants(max_len: usize) -> impl Strategy<Value = Vec<(Bonus, i32)>> {
        proptest::collection::vec((arb_percent_bonus(), 1i32..=50i32), 0..max_len)
    }

    /// A bonus set of up to `max_len` grants.
    pub fn arb_bonus_set(max_len: usize) -> impl Strategy<Value = BonusSet> {
        arb_bonus_grants(max_len).prop_map(|grants| grants.into_iter().collect())
    }

    /// Any unit category.
    pub fn arb_category() -> impl Strategy<Value = Category> {
        prop_oneof![
            Just(Category::Melee),
            Just(Category::Archery),
            Just(Category::Mounted),
            Just(Category::Siege),
            Just(Category::Recon),
        ]
    }

    /// An open-terrain tile with any mix of features, with or without a city.
    pub fn arb_tile() -> impl Strategy<Value = TileFeatures> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(forest, jungle, hills, city)| {
                let features = [
                    (forest, Feature::Forest),
                    (jungle, Feature::Jungle),
                    (hills, Feature::Hills),
                ]
                .into_iter()
                .filter_map(|(present, feature)| present.then_some(feature))
                .collect();
                TileFeatures {
                    features,
                    city,
                    ..TileFeatures::open()
                }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::skirmish_game;

    #[test]
    fn test_same_seed_same_game() {
        let result = verify_determinism(3, 10, || skirmish_game(42), play_ai_turn, game_hash);
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    fn test_hash_detects_change() {
        let mut game = skirmish_game(1);
        let before = game_hash(&game);
        play_ai_turn(&mut game);
        play_ai_turn(&mut game);
        // Wandering and seeking units change position
        let after = game_hash(&game);
        assert_eq!(game.turn(), 2);
        assert_ne!(before, after);
    }

    #[test]
    #[should_panic(expected = "non-deterministic")]
    fn test_assert_reports_divergence() {
        DeterminismResult {
            is_deterministic: false,
            hashes: vec![1, 2],
            turns: 1,
        }
        .assert_deterministic();
    }
}
