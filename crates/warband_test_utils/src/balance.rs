//! Duel statistics for checking the battle simulator against the odds.
//!
//! Runs thousands of seeded fights for one matchup and reports how often
//! each side won, so tests can compare the empirical win rate with the
//! closed-form figure.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use warband_core::battle::BattleSimulator;
use warband_core::bonus::{BonusSet, Side};
use warband_core::combat::CombatOdds;
use warband_core::components::{OwnerId, Unit};

use crate::fixtures::melee_unit;

/// Aggregate outcome of a set of duels.
#[derive(Debug, Clone, Default)]
pub struct DuelStats {
    /// Total fights run.
    pub total: u32,
    /// Fights won by the attacker.
    pub attacker_wins: u32,
    /// Fights won by the defender.
    pub defender_wins: u32,
    /// Total landed hits over all fights.
    pub total_rounds: u64,
    /// Sum of the winner's remaining hit points.
    pub total_winner_hp: u64,
}

impl DuelStats {
    /// Empirical attacker win rate (0.0 to 1.0).
    pub fn attacker_win_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.5;
        }
        self.attacker_wins as f64 / self.total as f64
    }

    /// Average landed hits per fight.
    pub fn mean_rounds(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.total_rounds as f64 / self.total as f64
    }

    /// Average remaining hit points of the winner.
    pub fn mean_winner_hp(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.total_winner_hp as f64 / self.total as f64
    }

    /// Whether the win rate is within `tolerance` of `expected`.
    pub fn converges_to(&self, expected: f64, tolerance: f64) -> bool {
        (self.attacker_win_rate() - expected).abs() <= tolerance
    }
}

/// Odds for two plain melee units of the given strengths, no bonuses.
pub fn plain_odds(attacker_strength: u32, defender_strength: u32) -> CombatOdds {
    let attacker = melee_unit(OwnerId(0), 1, attacker_strength);
    let defender = melee_unit(OwnerId(1), 2, defender_strength);
    odds_with(&attacker, &defender, &BonusSet::new(), &BonusSet::new())
}

/// Odds for two units with explicit bonus sets.
pub fn odds_with(
    attacker: &Unit,
    defender: &Unit,
    attacker_bonuses: &BonusSet,
    defender_bonuses: &BonusSet,
) -> CombatOdds {
    CombatOdds::from_bonuses(attacker, defender, attacker_bonuses, defender_bonuses)
}

/// Run `fights` duels with consecutive seeds starting at `seed`.
///
/// # Panics
///
/// Panics if a fight exceeds the simulator's round bound.
pub fn run_duels(odds: &CombatOdds, fights: u32, seed: u64) -> DuelStats {
    let simulator = BattleSimulator::new();
    let mut stats = DuelStats::default();
    for i in 0..fights {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(u64::from(i)));
        let battle = simulator.run(odds, &mut rng).expect("fight terminates");
        stats.total += 1;
        match battle.winner {
            Side::Attacker => stats.attacker_wins += 1,
            Side::Defender => stats.defender_wins += 1,
        }
        stats.total_rounds += battle.rounds.len() as u64;
        stats.total_winner_hp += u64::from(battle.winner_hit_points());
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_rate() {
        let stats = DuelStats {
            total: 100,
            attacker_wins: 55,
            defender_wins: 45,
            total_rounds: 900,
            total_winner_hp: 4000,
        };
        assert!((stats.attacker_win_rate() - 0.55).abs() < 0.001);
        assert!((stats.mean_rounds() - 9.0).abs() < 0.001);
        assert!((stats.mean_winner_hp() - 40.0).abs() < 0.001);
        assert!(stats.converges_to(0.5, 0.06));
        assert!(!stats.converges_to(0.5, 0.03));
    }

    #[test]
    fn test_empty_stats() {
        let stats = DuelStats::default();
        assert_eq!(stats.attacker_win_rate(), 0.5);
        assert_eq!(stats.mean_rounds(), 0.0);
    }

    #[test]
    fn test_duels_are_reproducible() {
        let odds = plain_odds(5, 3);
        let a = run_duels(&odds, 50, 7);
        let b = run_duels(&odds, 50, 7);
        assert_eq!(a.attacker_wins, b.attacker_wins);
        assert_eq!(a.total_rounds, b.total_rounds);
        assert_eq!(a.attacker_wins + a.defender_wins, 50);
    }

    #[test]
    fn test_stronger_side_usually_wins() {
        let stats = run_duels(&plain_odds(8, 2), 200, 0);
        assert!(stats.attacker_win_rate() > 0.9);
    }
}
