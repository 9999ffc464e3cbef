//! Batched duels for checking outcomes against the odds.
//!
//! Runs many simulated fights for one matchup in parallel using rayon.
//! Fight `i` draws from its own ChaCha8 stream seeded with `seed + i`, so a
//! batch gives the same totals on any thread count.

use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use warband_core::battle::BattleSimulator;
use warband_core::bonus::{BattleContext, Side};
use warband_core::combat::{CombatModel, CombatOdds};
use warband_core::components::{Coords, OwnerId, Unit, UnitId, UnitKey};
use warband_core::error::{GameError, Result};
use warband_core::map::{Feature, TileFeatures};
use warband_core::promotions::acquire_promotion;

use crate::scenario::DataTables;

/// One attacker against one defender on one kind of tile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matchup {
    /// Attacking unit type id.
    pub attacker: String,
    /// Defending unit type id.
    pub defender: String,
    /// Promotions the attacker acquires on top of its free ones.
    #[serde(default)]
    pub attacker_promotions: Vec<String>,
    /// Promotions the defender acquires on top of its free ones.
    #[serde(default)]
    pub defender_promotions: Vec<String>,
    /// Features on the defender's tile.
    #[serde(default)]
    pub features: Vec<Feature>,
    /// Whether the defender's tile holds a city.
    #[serde(default)]
    pub city: bool,
}

impl Matchup {
    /// A plain matchup on open ground.
    #[must_use]
    pub fn new(attacker: &str, defender: &str) -> Self {
        Self {
            attacker: attacker.to_string(),
            defender: defender.to_string(),
            ..Self::default()
        }
    }

    /// The defender's tile.
    #[must_use]
    pub fn tile(&self) -> TileFeatures {
        TileFeatures {
            features: self.features.clone(),
            city: self.city,
            ..TileFeatures::open()
        }
    }

    fn build_unit(
        tables: &DataTables,
        type_id: &str,
        key: UnitKey,
        promotions: &[String],
    ) -> Result<Unit> {
        let unit_type = tables
            .unit_types
            .get(type_id)
            .ok_or_else(|| GameError::UnknownUnitType(type_id.to_string()))?;
        let mut unit = unit_type.instantiate(key, Coords::default());
        for promotion in promotions {
            acquire_promotion(&tables.promotions, &mut unit, promotion)?;
        }
        Ok(unit)
    }

    /// Instantiate both sides with their promotions.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownUnitType`] or
    /// [`GameError::InvalidPromotion`].
    pub fn units(&self, tables: &DataTables) -> Result<(Unit, Unit)> {
        let attacker = Self::build_unit(
            tables,
            &self.attacker,
            UnitKey::new(OwnerId(0), UnitId(1)),
            &self.attacker_promotions,
        )?;
        let defender = Self::build_unit(
            tables,
            &self.defender,
            UnitKey::new(OwnerId::BARBARIAN, UnitId(2)),
            &self.defender_promotions,
        )?;
        Ok((attacker, defender))
    }

    /// Closed-form odds for this matchup.
    ///
    /// # Errors
    ///
    /// Same as [`Matchup::units`].
    pub fn odds(&self, tables: &DataTables) -> Result<CombatOdds> {
        let (attacker, defender) = self.units(tables)?;
        let model = CombatModel::new(&tables.promotions);
        Ok(model.evaluate(&BattleContext::new(&attacker, &defender, self.tile())))
    }
}

/// Configuration for a duel batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelConfig {
    /// Number of fights.
    pub count: u32,
    /// Seed of the first fight.
    pub seed: u64,
    /// Maximum worker threads (0 = rayon default).
    pub parallel: usize,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            count: 1000,
            seed: 0,
            parallel: 0,
        }
    }
}

/// Aggregate result of a duel batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelSummary {
    /// The matchup fought.
    pub matchup: Matchup,
    /// Figures every fight ran with.
    pub odds: CombatOdds,
    /// Fights completed.
    pub fights: u32,
    /// Fights won by the attacker.
    pub attacker_wins: u32,
    /// Fights won by the defender.
    pub defender_wins: u32,
    /// Empirical attacker win rate.
    pub attacker_win_rate: f64,
    /// Closed-form attacker odds.
    pub analytic_odds: f64,
    /// Win rate minus analytic odds.
    pub deviation: f64,
    /// Average landed hits per fight.
    pub mean_rounds: f64,
    /// Fights that broke the round bound.
    pub failed: u32,
    /// Wall-clock runtime.
    pub duration_seconds: f64,
}

/// Outcome of one fight: winner and landed hits.
type FightOutcome = Result<(Side, usize)>;

fn fight(odds: &CombatOdds, seed: u64) -> FightOutcome {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let battle = BattleSimulator::new().run(odds, &mut rng)?;
    Ok((battle.winner, battle.rounds.len()))
}

fn run_fights(odds: &CombatOdds, config: &DuelConfig) -> Vec<FightOutcome> {
    let work = || -> Vec<FightOutcome> {
        (0..config.count)
            .into_par_iter()
            .map(|i| fight(odds, config.seed.wrapping_add(u64::from(i))))
            .collect()
    };
    if config.parallel == 0 {
        return work();
    }
    match rayon::ThreadPoolBuilder::new()
        .num_threads(config.parallel)
        .build()
    {
        Ok(pool) => pool.install(work),
        Err(e) => {
            warn!(error = %e, "Failed to build thread pool, using the global pool");
            work()
        }
    }
}

/// Run a duel batch for a matchup.
///
/// # Errors
///
/// Fails if the matchup cannot be built. Fights that break the round bound
/// are counted in [`DuelSummary::failed`].
pub fn run_duels(
    matchup: &Matchup,
    tables: &DataTables,
    config: &DuelConfig,
) -> Result<DuelSummary> {
    let start = Instant::now();
    let odds = matchup.odds(tables)?;
    info!(
        attacker = %matchup.attacker,
        defender = %matchup.defender,
        odds = %odds.odds_attacker_wins,
        count = config.count,
        "Starting duel batch"
    );

    let mut attacker_wins = 0u32;
    let mut defender_wins = 0u32;
    let mut failed = 0u32;
    let mut total_rounds = 0u64;
    for outcome in run_fights(&odds, config) {
        match outcome {
            Ok((Side::Attacker, rounds)) => {
                attacker_wins += 1;
                total_rounds += rounds as u64;
            }
            Ok((Side::Defender, rounds)) => {
                defender_wins += 1;
                total_rounds += rounds as u64;
            }
            Err(e) => {
                warn!(error = %e, "Fight failed");
                failed += 1;
            }
        }
    }

    let fights = attacker_wins + defender_wins;
    let attacker_win_rate = if fights == 0 {
        0.0
    } else {
        f64::from(attacker_wins) / f64::from(fights)
    };
    let mean_rounds = if fights == 0 {
        0.0
    } else {
        total_rounds as f64 / f64::from(fights)
    };
    let analytic_odds = odds.odds_attacker_wins.to_num::<f64>();

    let summary = DuelSummary {
        matchup: matchup.clone(),
        odds,
        fights,
        attacker_wins,
        defender_wins,
        attacker_win_rate,
        analytic_odds,
        deviation: attacker_win_rate - analytic_odds,
        mean_rounds,
        failed,
        duration_seconds: start.elapsed().as_secs_f64(),
    };
    info!(
        win_rate = summary.attacker_win_rate,
        analytic = summary.analytic_odds,
        fights = summary.fights,
        "Duel batch complete"
    );
    Ok(summary)
}
