//! Round-by-round battle simulation.
//!
//! A fight runs `Start -> first strikes -> exchange rounds -> Resolved`.
//! Both sides start at [`HIT_POINTS`]; only the relative depletion matters.
//! Every random draw comes from the injected generator, so a seeded
//! generator replays the same fight.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bonus::Side;
use crate::combat::{CombatOdds, HIT_POINTS};
use crate::error::{GameError, Result};
use crate::math::{const_percent, unit_draw, Fixed};

/// Safety bound on exchange rounds. Exceeding it means the model is broken.
pub const MAX_ROUNDS: u32 = 10_000;

/// Chance that a single first-strike chance lands.
pub const FIRST_STRIKE_CHANCE: Fixed = const_percent(50);

/// Stage of the fight a round belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// A free hit before the exchange.
    FirstStrike,
    /// A contested round.
    Exchange,
}

/// One landed hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// 1-based sequence number over the whole fight.
    pub number: u32,
    /// Stage of the fight.
    pub phase: Phase,
    /// Side that landed the hit.
    pub striker: Side,
    /// Damage dealt.
    pub damage: u32,
    /// Attacker hit points after the hit.
    pub attacker_hp: u32,
    /// Defender hit points after the hit.
    pub defender_hp: u32,
}

/// A resolved engagement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battle {
    /// The figures the fight was run with.
    pub odds: CombatOdds,
    /// Every landed hit in order.
    pub rounds: Vec<Round>,
    /// The surviving side.
    pub winner: Side,
    /// Final hit points, attacker first.
    pub hit_points: [u32; 2],
    /// Human-readable combat log.
    pub log: Vec<String>,
}

impl Battle {
    /// The depleted side.
    #[must_use]
    pub const fn loser(&self) -> Side {
        self.winner.opponent()
    }

    /// Remaining hit points of the winner.
    #[must_use]
    pub const fn winner_hit_points(&self) -> u32 {
        self.hit_points[self.winner.index()]
    }

    /// Number of contested rounds fought.
    #[must_use]
    pub fn exchange_rounds(&self) -> usize {
        self.rounds.iter().filter(|r| r.phase == Phase::Exchange).count()
    }
}

/// In-flight fight state.
struct Fight {
    odds: CombatOdds,
    hp: [u32; 2],
    rounds: Vec<Round>,
    log: Vec<String>,
}

impl Fight {
    fn new(odds: CombatOdds) -> Self {
        let log = vec![format!(
            "Attacker strength {:.2} vs defender strength {:.2}, odds {:.1}%",
            odds.attacker_strength.to_num::<f64>(),
            odds.defender_strength.to_num::<f64>(),
            odds.odds_attacker_wins.to_num::<f64>() * 100.0,
        )];
        Self {
            odds,
            hp: [HIT_POINTS; 2],
            rounds: Vec::new(),
            log,
        }
    }

    fn decided(&self) -> bool {
        self.hp.contains(&0)
    }

    fn hit(&mut self, striker: Side, phase: Phase) {
        let target = striker.opponent().index();
        let damage = self.odds.damage_per_hit[striker.index()];
        self.hp[target] = self.hp[target].saturating_sub(damage).min(HIT_POINTS);

        let number = u32::try_from(self.rounds.len()).unwrap_or(u32::MAX).saturating_add(1);
        let round = Round {
            number,
            phase,
            striker,
            damage,
            attacker_hp: self.hp[0],
            defender_hp: self.hp[1],
        };
        tracing::debug!(
            round = number,
            ?phase,
            ?striker,
            damage,
            attacker_hp = round.attacker_hp,
            defender_hp = round.defender_hp,
            "Combat round"
        );
        let label = match phase {
            Phase::FirstStrike => "first strike",
            Phase::Exchange => "hit",
        };
        self.log.push(format!(
            "Round {number}: {striker:?} {label} for {damage} (attacker {}, defender {})",
            round.attacker_hp, round.defender_hp
        ));
        self.rounds.push(round);
    }

    fn finish(mut self) -> Battle {
        let winner = if self.hp[1] == 0 {
            Side::Attacker
        } else {
            Side::Defender
        };
        self.log.push(format!("{winner:?} wins"));
        Battle {
            odds: self.odds,
            rounds: self.rounds,
            winner,
            hit_points: self.hp,
            log: self.log,
        }
    }
}

/// Runs fights to a terminal outcome.
#[derive(Debug, Clone, Copy)]
pub struct BattleSimulator {
    max_rounds: u32,
}

impl Default for BattleSimulator {
    fn default() -> Self {
        Self {
            max_rounds: MAX_ROUNDS,
        }
    }
}

impl BattleSimulator {
    /// Simulator with the standard round bound.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulator with a custom round bound.
    #[must_use]
    pub const fn with_round_limit(max_rounds: u32) -> Self {
        Self { max_rounds }
    }

    /// Run one fight with the given figures.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvariantViolation`] if the exchange exceeds the
    /// round bound.
    pub fn run<R: Rng + ?Sized>(&self, odds: &CombatOdds, rng: &mut R) -> Result<Battle> {
        let mut fight = Fight::new(odds.clone());

        for side in [Side::Attacker, Side::Defender] {
            for _ in 0..odds.first_strikes[side.index()] {
                if fight.decided() {
                    return Ok(fight.finish());
                }
                fight.hit(side, Phase::FirstStrike);
            }
        }

        for side in [Side::Attacker, Side::Defender] {
            for _ in 0..odds.first_strike_chances[side.index()] {
                if fight.decided() {
                    return Ok(fight.finish());
                }
                if unit_draw(rng) < FIRST_STRIKE_CHANCE {
                    fight.hit(side, Phase::FirstStrike);
                }
            }
        }

        let mut exchanges = 0u32;
        while !fight.decided() {
            exchanges += 1;
            if exchanges > self.max_rounds {
                return Err(GameError::InvariantViolation(format!(
                    "fight exceeded {} rounds (odds {})",
                    self.max_rounds, odds.odds_attacker_wins
                )));
            }
            let striker = if unit_draw(rng) < odds.odds_attacker_wins {
                Side::Attacker
            } else {
                Side::Defender
            };
            fight.hit(striker, Phase::Exchange);
        }

        Ok(fight.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn odds(a: u32, d: u32) -> CombatOdds {
        let a = Fixed::from_num(a);
        let d = Fixed::from_num(d);
        CombatOdds {
            attacker_strength: a,
            defender_strength: d,
            damage_per_hit: [
                crate::combat::damage_per_hit(a, d),
                crate::combat::damage_per_hit(d, a),
            ],
            odds_attacker_wins: crate::combat::win_odds(a, d),
            first_strikes: [0, 0],
            first_strike_chances: [0, 0],
            withdraw_percent: [0, 0],
        }
    }

    #[test]
    fn test_fight_terminates_with_one_side_at_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let battle = BattleSimulator::new().run(&odds(4, 4), &mut rng).unwrap();
        let loser = battle.loser().index();
        assert_eq!(battle.hit_points[loser], 0);
        assert!(battle.winner_hit_points() > 0);

        // Only the final round reaches zero
        let (last, earlier) = battle.rounds.split_last().unwrap();
        assert!(last.attacker_hp == 0 || last.defender_hp == 0);
        assert!(earlier.iter().all(|r| r.attacker_hp > 0 && r.defender_hp > 0));
    }

    #[test]
    fn test_same_seed_same_fight() {
        let o = odds(5, 3);
        let a = BattleSimulator::new()
            .run(&o, &mut ChaCha8Rng::seed_from_u64(99))
            .unwrap();
        let b = BattleSimulator::new()
            .run(&o, &mut ChaCha8Rng::seed_from_u64(99))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_first_strikes_land_before_exchange() {
        let mut o = odds(4, 4);
        o.first_strikes = [0, 2];
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let battle = BattleSimulator::new().run(&o, &mut rng).unwrap();

        assert_eq!(battle.rounds[0].phase, Phase::FirstStrike);
        assert_eq!(battle.rounds[0].striker, Side::Defender);
        assert_eq!(battle.rounds[1].phase, Phase::FirstStrike);
        assert_eq!(battle.rounds[1].attacker_hp, 60);
        assert!(battle.rounds[2..].iter().all(|r| r.phase == Phase::Exchange));
    }

    #[test]
    fn test_first_strikes_can_decide_fight() {
        let mut o = odds(4, 4);
        o.first_strikes = [10, 0];
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let battle = BattleSimulator::new().run(&o, &mut rng).unwrap();

        assert_eq!(battle.winner, Side::Attacker);
        assert_eq!(battle.rounds.len(), 5);
        assert_eq!(battle.exchange_rounds(), 0);
    }

    #[test]
    fn test_round_limit_violation() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let err = BattleSimulator::with_round_limit(2)
            .run(&odds(4, 4), &mut rng)
            .unwrap_err();
        assert!(matches!(err, GameError::InvariantViolation(_)));
    }

    #[test]
    fn test_log_records_every_round() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let battle = BattleSimulator::new().run(&odds(6, 2), &mut rng).unwrap();
        // Header + one line per round + outcome
        assert_eq!(battle.log.len(), battle.rounds.len() + 2);
        assert!(battle.log.last().unwrap().ends_with("wins"));
    }
}
