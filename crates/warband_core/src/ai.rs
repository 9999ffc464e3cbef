//! Reactive decision policy for autonomous (barbarian) units.
//!
//! Each invocation picks exactly one action for one unit from a fixed
//! priority ladder. The first rule whose condition holds wins:
//!
//! | rule | condition | action |
//! |------|-----------|--------|
//! | a | in a city with 3+ friendly units, adjacent enemy at odds >= 0.75 | attack it |
//! | b | in a city | garrison |
//! | c | adjacent enemy at odds >= 0.25 | attack the best one |
//! | d | adjacent enemy-free city tile | move onto it |
//! | e | enemy within 3 tiles at odds >= 0.5 | step toward it |
//! | f | adjacent enemy at odds < 0.25 | retreat out of its reach |
//! | g | can heal and damaged | heal |
//! | h | 50 % draw | step toward the first known city |
//! | i | 75 % draw | step in a random direction |
//! | j | otherwise | pass |
//!
//! The policy reads the map, the registry and the combat model; it never
//! mutates them. The chosen action is executed through the same order API
//! a human player uses.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bonus::BonusSet;
use crate::combat::CombatModel;
use crate::components::{Coords, Unit, UnitKey, COMPASS};
use crate::error::{GameError, Result};
use crate::map::Map;
use crate::math::{const_percent, unit_draw, Fixed};
use crate::registry::UnitRegistry;

/// Chebyshev radius scanned for enemies.
pub const SCAN_RADIUS: i32 = 3;

/// Odds needed to sally out of a well-garrisoned city.
pub const CITY_ATTACK_ODDS: Fixed = const_percent(75);

/// Odds needed to attack an adjacent enemy; below this the unit retreats.
pub const ATTACK_ODDS: Fixed = const_percent(25);

/// Odds needed to advance on an enemy in scan range.
pub const ADVANCE_ODDS: Fixed = const_percent(50);

/// Friendly units (including self) needed in a city before sallying out.
pub const GARRISON_SIZE: usize = 3;

/// Chance to head for a city when nothing else applies.
pub const SEEK_CITY_CHANCE: Fixed = const_percent(50);

/// Chance to wander when not heading for a city.
pub const WANDER_CHANCE: Fixed = const_percent(75);

/// Ladder rule that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LadderRule {
    /// (a) Attack out of a strong garrison.
    CityAttack,
    /// (b) Hold the city.
    Garrison,
    /// (c) Attack an adjacent enemy.
    Attack,
    /// (d) Step onto an adjacent city.
    EnterCity,
    /// (e) Close in on a weaker enemy.
    Advance,
    /// (f) Move away from a stronger enemy.
    Retreat,
    /// (g) Rest to recover strength.
    Heal,
    /// (h) Head for a known city.
    SeekCity,
    /// (i) Random step.
    Wander,
    /// (j) Nothing to do.
    Idle,
}

impl fmt::Display for LadderRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CityAttack => "city attack",
            Self::Garrison => "garrison",
            Self::Attack => "attack",
            Self::EnterCity => "enter city",
            Self::Advance => "advance",
            Self::Retreat => "retreat",
            Self::Heal => "heal",
            Self::SeekCity => "seek city",
            Self::Wander => "wander",
            Self::Idle => "idle",
        };
        f.write_str(name)
    }
}

/// Action chosen for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiAction {
    /// Attack the best defender on an adjacent tile.
    Attack(Coords),
    /// Move one step onto an adjacent tile.
    Move(Coords),
    /// Take one path step toward a distant tile.
    StepToward(Coords),
    /// Stay in the city.
    Garrison,
    /// Stay and heal.
    Heal,
    /// End the turn without acting.
    Pass,
}

/// A policy decision: the action and the rule that chose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Rule that fired.
    pub rule: LadderRule,
    /// Chosen action.
    pub action: AiAction,
}

impl Decision {
    const fn new(rule: LadderRule, action: AiAction) -> Self {
        Self { rule, action }
    }
}

/// A visible enemy tile and the odds of attacking its best defender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnemyCandidate {
    /// Enemy tile.
    pub coords: Coords,
    /// The defender the attack would meet.
    pub defender: UnitKey,
    /// Odds of the attack succeeding.
    pub odds: Fixed,
    /// Chebyshev distance from the deciding unit.
    pub distance: u32,
}

/// Read-only view of the game handed to the policy.
pub struct DecisionContext<'a, M: Map + ?Sized> {
    /// Tile map.
    pub map: &'a M,
    /// All units.
    pub units: &'a UnitRegistry,
    /// Combat model for odds queries.
    pub model: CombatModel<'a>,
}

impl<'a, M: Map + ?Sized> DecisionContext<'a, M> {
    /// Create a context.
    pub fn new(map: &'a M, units: &'a UnitRegistry, model: CombatModel<'a>) -> Self {
        Self { map, units, model }
    }

    /// Visible enemy tiles within [`SCAN_RADIUS`], best odds first.
    ///
    /// Equal odds keep scan order (row by row, then column).
    #[must_use]
    pub fn enemy_candidates(&self, unit: &Unit) -> Vec<EnemyCandidate> {
        let owner = unit.owner();
        let mut candidates: Vec<EnemyCandidate> = unit
            .position
            .within(SCAN_RADIUS)
            .filter_map(|coords| {
                let tile = self.map.tile(coords, Some(owner))?;
                if !self.units.has_enemy_at(coords, owner) {
                    return None;
                }
                let (defender, odds) = self.model.best_defender(
                    unit,
                    self.units.units_at(coords),
                    &tile.combat_features(),
                )?;
                Some(EnemyCandidate {
                    coords,
                    defender: defender.key,
                    odds: odds.odds_attacker_wins,
                    distance: unit.position.chebyshev(coords),
                })
            })
            .collect();
        // Stable: ties keep scan order
        candidates.sort_by(|a, b| b.odds.cmp(&a.odds));
        candidates
    }

    /// Whether `unit` may move onto `to` this turn without fighting.
    #[must_use]
    pub fn can_enter(&self, unit: &Unit, bonuses: &BonusSet, to: Coords) -> bool {
        unit.current_movement > 0
            && self.map.valid_coords(to)
            && self.map.movement_cost(unit.position, to, bonuses).is_some()
            && !self.units.has_enemy_at(to, unit.owner())
    }

    fn in_city(&self, unit: &Unit) -> bool {
        self.map
            .tile(unit.position, None)
            .is_some_and(|t| t.city.is_some())
    }
}

/// The barbarian decision ladder.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionPolicy;

impl DecisionPolicy {
    /// Create the policy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Choose one action for the unit.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] if the unit is not registered.
    pub fn decide<M, R>(
        &self,
        ctx: &DecisionContext<'_, M>,
        key: UnitKey,
        rng: &mut R,
    ) -> Result<Decision>
    where
        M: Map + ?Sized,
        R: Rng + ?Sized,
    {
        let unit = ctx.units.get(key).ok_or(GameError::UnitNotFound(key))?;
        let owner = unit.owner();
        let here = unit.position;
        let bonuses = ctx.model.resolver().innate(unit);

        let candidates = ctx.enemy_candidates(unit);
        tracing::debug!(unit = %key, candidates = candidates.len(), "Scanned for enemies");
        let mut adjacent = candidates.iter().filter(|c| c.distance == 1);

        // (a) + (b)
        if ctx.in_city(unit) {
            if ctx.units.friendly_count_at(here, owner) >= GARRISON_SIZE {
                if let Some(target) = adjacent.clone().find(|c| c.odds >= CITY_ATTACK_ODDS) {
                    return Ok(Decision::new(
                        LadderRule::CityAttack,
                        AiAction::Attack(target.coords),
                    ));
                }
            }
            return Ok(Decision::new(LadderRule::Garrison, AiAction::Garrison));
        }

        // (c)
        if let Some(target) = adjacent.find(|c| c.odds >= ATTACK_ODDS) {
            return Ok(Decision::new(LadderRule::Attack, AiAction::Attack(target.coords)));
        }

        // (d)
        let city_step = here.neighbors().find(|&n| {
            ctx.map
                .tile(n, Some(owner))
                .is_some_and(|t| t.city.is_some())
                && ctx.can_enter(unit, &bonuses, n)
        });
        if let Some(city) = city_step {
            return Ok(Decision::new(LadderRule::EnterCity, AiAction::Move(city)));
        }

        // (e)
        if let Some(target) = candidates.iter().find(|c| c.odds >= ADVANCE_ODDS) {
            return Ok(Decision::new(
                LadderRule::Advance,
                AiAction::StepToward(target.coords),
            ));
        }

        // (f) every adjacent enemy is below the attack threshold here
        let adjacent: Vec<&EnemyCandidate> =
            candidates.iter().filter(|c| c.distance == 1).collect();
        let threat = adjacent.iter().min_by(|a, b| a.odds.cmp(&b.odds));
        if let Some(threat) = threat {
            let open: Vec<Coords> = here
                .neighbors()
                .filter(|&n| n.chebyshev(threat.coords) > 1 && ctx.can_enter(unit, &bonuses, n))
                .collect();
            // Prefer tiles clear of every adjacent enemy
            let clear: Vec<Coords> = open
                .iter()
                .copied()
                .filter(|&n| adjacent.iter().all(|e| n.chebyshev(e.coords) > 1))
                .collect();
            let escapes = if clear.is_empty() { open } else { clear };
            if !escapes.is_empty() {
                let pick = escapes[rng.gen_range(0..escapes.len())];
                return Ok(Decision::new(LadderRule::Retreat, AiAction::Move(pick)));
            }
            tracing::debug!(unit = %key, "No retreat available");
        }

        // (g)
        if unit.can_heal && unit.is_damaged() {
            return Ok(Decision::new(LadderRule::Heal, AiAction::Heal));
        }

        // (h)
        if unit_draw(rng) < SEEK_CITY_CHANCE {
            let known_city = ctx
                .map
                .cities()
                .into_iter()
                .map(|(coords, _)| coords)
                .find(|&c| c != here && ctx.map.tile(c, Some(owner)).is_some());
            if let Some(city) = known_city {
                return Ok(Decision::new(LadderRule::SeekCity, AiAction::StepToward(city)));
            }
        }

        // (i)
        if unit_draw(rng) < WANDER_CHANCE {
            let direction = COMPASS[rng.gen_range(0..COMPASS.len())];
            let to = here.offset(direction);
            let action = if ctx.can_enter(unit, &bonuses, to) {
                AiAction::Move(to)
            } else {
                AiAction::Pass
            };
            return Ok(Decision::new(LadderRule::Wander, action));
        }

        // (j)
        Ok(Decision::new(LadderRule::Idle, AiAction::Pass))
    }
}
