//! Turn-based game loop and the public unit action API.
//!
//! [`Game`] owns the map, the units, the static data tables, the path queue
//! and the single random source. Humans and the AI drive units through the
//! same entry point, [`Game::order`]; the outcome of every action is queued
//! as a [`GameEvent`] for the presentation layer to drain.
//!
//! # Determinism
//!
//! All randomness (combat rounds, AI draws) comes from one `ChaCha8Rng`
//! seeded at construction, and units are processed in ascending id order,
//! so the same seed and orders replay the same game.
//!
//! # Example
//!
//! ```
//! use warband_core::prelude::*;
//!
//! let map = GridMap::new(8, 8, Terrain::Grassland);
//! let mut game = Game::new(map, 42).unwrap();
//!
//! let warrior = game.spawn_unit(OwnerId(0), "warrior", Coords::new(2, 2)).unwrap();
//! game.spawn_unit(OwnerId::BARBARIAN, "warrior", Coords::new(2, 3)).unwrap();
//!
//! let odds = game.odds(warrior, Coords::new(2, 3)).unwrap();
//! assert_eq!(odds.odds_attacker_wins, Fixed::from_num(0.5));
//!
//! game.order(warrior, Order::Attack(Coords::new(2, 3))).unwrap();
//! assert!(!game.drain_events().is_empty());
//! ```

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::ai::{AiAction, DecisionContext, DecisionPolicy, Decision, LadderRule};
use crate::battle::BattleSimulator;
use crate::bonus::{Bonus, BonusSet, Side};
use crate::combat::{CombatModel, CombatOdds};
use crate::components::{Activity, Coords, OwnerId, Unit, UnitKey};
use crate::data::{PromotionTable, UnitTypeTable};
use crate::error::{GameError, MoveRejection, Result};
use crate::map::{GridMap, Map};
use crate::math::{fixed_decimal, Fixed};
use crate::pathfinding::{PathIntent, PathQueue, PathTicket};
use crate::promotions;
use crate::registry::UnitRegistry;

/// Healing per turn in the field, percent of base strength.
pub const FIELD_HEAL_PERCENT: i32 = 10;

/// Healing per turn in a friendly city, percent of base strength.
pub const CITY_HEAL_PERCENT: i32 = 20;

/// A unit action, issued by a player or the AI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    /// Step onto an adjacent tile.
    Move(Coords),
    /// Attack the best defender on an adjacent tile.
    Attack(Coords),
    /// Dig in for the rest of the turn.
    Fortify,
    /// Rest to recover strength.
    Heal,
    /// End the unit's turn.
    Skip,
    /// Walk toward a tile along a path.
    Goto(Coords),
}

/// Outcome of one fight, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleReport {
    /// Attacking unit.
    pub attacker: UnitKey,
    /// Defending unit.
    pub defender: UnitKey,
    /// Defender's tile.
    pub coords: Coords,
    /// Side that survived.
    pub winner_side: Side,
    /// Side that was destroyed.
    pub loser_side: Side,
    /// Attacker's odds before the fight.
    #[serde(with = "fixed_decimal")]
    pub odds: Fixed,
    /// Number of landed hits.
    pub rounds: usize,
    /// Combat log lines.
    pub log: Vec<String>,
}

impl BattleReport {
    /// The surviving unit.
    #[must_use]
    pub const fn winner(&self) -> UnitKey {
        match self.winner_side {
            Side::Attacker => self.attacker,
            Side::Defender => self.defender,
        }
    }

    /// The destroyed unit.
    #[must_use]
    pub const fn loser(&self) -> UnitKey {
        match self.loser_side {
            Side::Attacker => self.attacker,
            Side::Defender => self.defender,
        }
    }
}

/// Notifications produced by the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum GameEvent {
    /// A fight was resolved.
    Battle(BattleReport),
    /// A unit changed tile.
    UnitMoved {
        /// Unit that moved.
        unit: UnitKey,
        /// Previous tile.
        from: Coords,
        /// New tile.
        to: Coords,
    },
    /// A unit was removed from play.
    UnitDestroyed {
        /// Destroyed unit.
        unit: UnitKey,
        /// Unit that destroyed it.
        by: UnitKey,
    },
    /// The AI chose an action for a unit.
    AiDecision {
        /// Unit the decision is for.
        unit: UnitKey,
        /// Rule that fired.
        rule: LadderRule,
        /// Chosen action.
        action: AiAction,
    },
    /// A turn ended.
    TurnEnded {
        /// Number of the turn that just ended.
        turn: u32,
    },
}

/// The game state and its rules.
#[derive(Debug, Clone)]
pub struct Game {
    map: GridMap,
    units: UnitRegistry,
    promotions: PromotionTable,
    unit_types: UnitTypeTable,
    rng: ChaCha8Rng,
    paths: PathQueue,
    policy: DecisionPolicy,
    simulator: BattleSimulator,
    turn: u32,
    events: Vec<GameEvent>,
}

impl Game {
    /// Create a game using the shipped data tables.
    ///
    /// # Errors
    ///
    /// Fails only if the embedded data is broken.
    pub fn new(map: GridMap, seed: u64) -> Result<Self> {
        Self::with_data(map, PromotionTable::embedded()?, UnitTypeTable::embedded()?, seed)
    }

    /// Create a game with custom data tables.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidData`] if a unit type grants a promotion
    /// that is missing or not available to its category.
    pub fn with_data(
        map: GridMap,
        promotions: PromotionTable,
        unit_types: UnitTypeTable,
        seed: u64,
    ) -> Result<Self> {
        unit_types.check_promotions(&promotions)?;
        Ok(Self {
            map,
            units: UnitRegistry::new(),
            promotions,
            unit_types,
            rng: ChaCha8Rng::seed_from_u64(seed),
            paths: PathQueue::new(),
            policy: DecisionPolicy::new(),
            simulator: BattleSimulator::new(),
            turn: 0,
            events: Vec::new(),
        })
    }

    /// The map.
    #[must_use]
    pub const fn map(&self) -> &GridMap {
        &self.map
    }

    /// Mutable map access, for scenario setup.
    pub fn map_mut(&mut self) -> &mut GridMap {
        &mut self.map
    }

    /// All units.
    #[must_use]
    pub const fn units(&self) -> &UnitRegistry {
        &self.units
    }

    /// Mutable unit access, for scenario setup.
    pub fn units_mut(&mut self) -> &mut UnitRegistry {
        &mut self.units
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, key: UnitKey) -> Option<&Unit> {
        self.units.get(key)
    }

    /// The promotion table.
    #[must_use]
    pub const fn promotions(&self) -> &PromotionTable {
        &self.promotions
    }

    /// The unit type table.
    #[must_use]
    pub const fn unit_types(&self) -> &UnitTypeTable {
        &self.unit_types
    }

    /// Number of completed turns.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Whether a path request is still waiting to be resolved.
    #[must_use]
    pub fn path_pending(&self, ticket: PathTicket) -> bool {
        self.paths.is_pending(ticket)
    }

    /// Take all queued events.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn model(&self) -> CombatModel<'_> {
        CombatModel::new(&self.promotions)
    }

    fn innate_bonuses(&self, unit: &Unit) -> BonusSet {
        self.model().resolver().innate(unit)
    }

    fn max_movement(&self, unit: &Unit) -> u32 {
        unit.movement + self.innate_bonuses(unit).count(Bonus::Movement)
    }

    /// Spawn a unit of a registered type.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownUnitType`] or
    /// [`GameError::InvalidPlacement`].
    pub fn spawn_unit(&mut self, owner: OwnerId, type_id: &str, coords: Coords) -> Result<UnitKey> {
        let unit_type = self
            .unit_types
            .get(type_id)
            .ok_or_else(|| GameError::UnknownUnitType(type_id.to_string()))?;
        if !self.map.is_passable(coords) {
            return Err(GameError::InvalidPlacement(coords));
        }
        let key = self.units.spawn(owner, unit_type, coords);
        if let Some(unit) = self.units.get(key) {
            let movement = self.max_movement(unit);
            if let Some(unit) = self.units.get_mut(key) {
                unit.current_movement = movement;
            }
        }
        tracing::debug!(unit = %key, unit_type = type_id, %coords, "Unit spawned");
        Ok(key)
    }

    /// Acquire a promotion for a unit.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] or [`GameError::InvalidPromotion`].
    pub fn promote(&mut self, key: UnitKey, promotion: &str) -> Result<()> {
        let unit = self.units.get_mut(key).ok_or(GameError::UnitNotFound(key))?;
        promotions::acquire_promotion(&self.promotions, unit, promotion)
    }

    /// Odds of `attacker` attacking the tile at `target`. Pure.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`], or [`GameError::IllegalMove`]
    /// when the tile is off the map or holds no enemy.
    pub fn odds(&self, attacker: UnitKey, target: Coords) -> Result<CombatOdds> {
        let unit = self.units.get(attacker).ok_or(GameError::UnitNotFound(attacker))?;
        let tile = self
            .map
            .get(target)
            .ok_or_else(|| GameError::illegal_move(attacker, target, MoveRejection::OffMap))?;
        self.model()
            .best_defender(unit, self.units.units_at(target), &tile.combat_features())
            .map(|(_, odds)| odds)
            .ok_or_else(|| GameError::illegal_move(attacker, target, MoveRejection::NoDefender))
    }

    /// Execute an order for a unit.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] or [`GameError::IllegalMove`];
    /// nothing is changed in either case. A fight that breaks the round
    /// bound returns [`GameError::InvariantViolation`].
    pub fn order(&mut self, key: UnitKey, order: Order) -> Result<()> {
        let result = self.execute(key, order);
        if let Err(err) = &result {
            tracing::warn!(unit = %key, ?order, %err, "Order rejected");
        }
        result
    }

    fn execute(&mut self, key: UnitKey, order: Order) -> Result<()> {
        if !self.units.contains(key) {
            return Err(GameError::UnitNotFound(key));
        }
        match order {
            Order::Move(to) => {
                self.paths.cancel(key);
                self.step(key, to)
            }
            Order::Attack(target) => self.attack(key, target).map(|_| ()),
            Order::Fortify => {
                self.hold(key, Activity::Fortified);
                Ok(())
            }
            Order::Heal => {
                self.hold(key, Activity::Healing);
                Ok(())
            }
            Order::Skip => {
                self.hold(key, Activity::Idle);
                Ok(())
            }
            Order::Goto(target) => {
                if !self.map.valid_coords(target) {
                    return Err(GameError::illegal_move(key, target, MoveRejection::OffMap));
                }
                let unit = self.units.get(key).ok_or(GameError::UnitNotFound(key))?;
                let bonuses = self.innate_bonuses(unit);
                if self.map.find_path(unit.position, target, &bonuses).is_none() {
                    return Err(GameError::illegal_move(key, target, MoveRejection::Unreachable));
                }
                self.paths.request(key, target, PathIntent::Travel);
                self.pump_paths();
                Ok(())
            }
        }
    }

    /// Spend the rest of the turn in place.
    fn hold(&mut self, key: UnitKey, activity: Activity) {
        if let Some(unit) = self.units.get_mut(key) {
            unit.activity = activity;
            unit.current_movement = 0;
        }
    }

    /// Check that a unit may act on an adjacent tile.
    fn check_adjacent(&self, unit: &Unit, to: Coords) -> Result<()> {
        let key = unit.key;
        if !self.map.valid_coords(to) {
            return Err(GameError::illegal_move(key, to, MoveRejection::OffMap));
        }
        if !unit.position.is_adjacent(to) {
            return Err(GameError::illegal_move(key, to, MoveRejection::NotAdjacent));
        }
        if unit.current_movement == 0 {
            return Err(GameError::illegal_move(key, to, MoveRejection::NoMovementLeft));
        }
        Ok(())
    }

    /// Move one step without fighting.
    fn step(&mut self, key: UnitKey, to: Coords) -> Result<()> {
        let unit = self.units.get(key).ok_or(GameError::UnitNotFound(key))?;
        self.check_adjacent(unit, to)?;
        let bonuses = self.innate_bonuses(unit);
        let cost = self
            .map
            .movement_cost(unit.position, to, &bonuses)
            .ok_or_else(|| GameError::illegal_move(key, to, MoveRejection::Impassable))?;
        if self.units.has_enemy_at(to, key.owner) {
            return Err(GameError::illegal_move(key, to, MoveRejection::OccupiedByEnemy));
        }

        let unit = self.units.get_mut(key).ok_or(GameError::UnitNotFound(key))?;
        let from = unit.position;
        unit.position = to;
        unit.current_movement = unit.current_movement.saturating_sub(cost);
        unit.acted = true;
        unit.activity = Activity::Idle;
        tracing::debug!(unit = %key, %from, %to, "Unit moved");
        self.events.push(GameEvent::UnitMoved { unit: key, from, to });
        Ok(())
    }

    /// Fight the best defender on an adjacent tile.
    fn attack(&mut self, key: UnitKey, target: Coords) -> Result<BattleReport> {
        let attacker = self.units.get(key).ok_or(GameError::UnitNotFound(key))?;
        self.check_adjacent(attacker, target)?;
        let tile = self
            .map
            .get(target)
            .ok_or_else(|| GameError::illegal_move(key, target, MoveRejection::OffMap))?;
        let (defender, odds) = self
            .model()
            .best_defender(attacker, self.units.units_at(target), &tile.combat_features())
            .ok_or_else(|| GameError::illegal_move(key, target, MoveRejection::NoDefender))?;
        let defender = defender.key;

        let battle = self.simulator.run(&odds, &mut self.rng)?;

        let report = BattleReport {
            attacker: key,
            defender,
            coords: target,
            winner_side: battle.winner,
            loser_side: battle.loser(),
            odds: odds.odds_attacker_wins,
            rounds: battle.rounds.len(),
            log: battle.log.clone(),
        };
        let winner = report.winner();
        let loser = report.loser();

        self.units.remove(loser);
        self.paths.cancel(loser);

        if let Some(unit) = self.units.get_mut(winner) {
            let hp = Fixed::from_num(battle.winner_hit_points());
            let scaled = unit.current_strength * hp / Fixed::from_num(100);
            unit.current_strength = scaled.max(Fixed::DELTA);
        }
        if let Some(unit) = self.units.get_mut(key) {
            unit.current_movement = 0;
            unit.acted = true;
            unit.activity = Activity::Idle;
        }

        tracing::info!(
            attacker = %key,
            defender = %defender,
            %target,
            odds = %odds.odds_attacker_wins,
            winner = ?battle.winner,
            rounds = report.rounds,
            "Battle resolved"
        );
        self.events.push(GameEvent::Battle(report.clone()));
        self.events.push(GameEvent::UnitDestroyed { unit: loser, by: winner });
        Ok(report)
    }

    /// Queue a path request for a unit.
    pub fn request_path(&mut self, key: UnitKey, target: Coords, intent: PathIntent) -> PathTicket {
        self.paths.request(key, target, intent)
    }

    /// Resolve every outstanding path request and move the units.
    ///
    /// Requests whose unit no longer exists are dropped. Returns the number
    /// of requests that produced at least one step.
    pub fn pump_paths(&mut self) -> usize {
        let mut moved = 0;
        for request in self.paths.drain() {
            let Some(unit) = self.units.get(request.unit) else {
                tracing::debug!(unit = %request.unit, ticket = request.ticket.0, "Dropping stale path request");
                continue;
            };
            let bonuses = self.innate_bonuses(unit);
            let Some(path) = self.map.find_path(unit.position, request.target, &bonuses) else {
                tracing::debug!(
                    unit = %request.unit,
                    target = %request.target,
                    "No path to target"
                );
                continue;
            };

            let steps = match request.intent {
                PathIntent::Step => 1,
                PathIntent::Travel => path.len(),
            };
            let mut took_step = false;
            for &next in path.iter().take(steps) {
                let has_movement = self
                    .units
                    .get(request.unit)
                    .is_some_and(|u| u.current_movement > 0);
                if !has_movement {
                    break;
                }
                if let Err(err) = self.step(request.unit, next) {
                    tracing::debug!(unit = %request.unit, %err, "Path step blocked");
                    break;
                }
                took_step = true;
            }
            if took_step {
                moved += 1;
            }
        }
        moved
    }

    /// Let the decision policy act for every ready unit of `owner`.
    ///
    /// Units are processed in ascending id order. A failing unit is logged
    /// and skipped; the rest of the turn continues.
    pub fn run_ai_turn(&mut self, owner: OwnerId) -> Vec<(UnitKey, Decision)> {
        let mut decisions = Vec::new();
        for key in self.units.units_of(owner) {
            let ready = self
                .units
                .get(key)
                .is_some_and(|u| !u.acted && u.current_movement > 0);
            if !ready {
                continue;
            }

            let ctx = DecisionContext::new(&self.map, &self.units, CombatModel::new(&self.promotions));
            let decision = match self.policy.decide(&ctx, key, &mut self.rng) {
                Ok(decision) => decision,
                Err(err) => {
                    tracing::warn!(unit = %key, %err, "Decision failed");
                    continue;
                }
            };
            tracing::info!(unit = %key, rule = %decision.rule, action = ?decision.action, "AI decision");
            self.events.push(GameEvent::AiDecision {
                unit: key,
                rule: decision.rule,
                action: decision.action,
            });

            let result = match decision.action {
                AiAction::Attack(target) => self.order(key, Order::Attack(target)),
                AiAction::Move(to) => self.order(key, Order::Move(to)),
                AiAction::StepToward(target) => {
                    self.paths.request(key, target, PathIntent::Step);
                    self.pump_paths();
                    Ok(())
                }
                AiAction::Garrison => self.order(key, Order::Fortify),
                AiAction::Heal => self.order(key, Order::Heal),
                AiAction::Pass => self.order(key, Order::Skip),
            };
            if result.is_err() {
                self.hold(key, Activity::Idle);
            }
            decisions.push((key, decision));
        }
        decisions
    }

    /// Heal resting units, restore movement and advance the turn counter.
    ///
    /// A unit that did not move or fight recovers 10 % of its base strength
    /// in the field or 20 % in a friendly city, plus any `Heal` bonus.
    pub fn end_turn(&mut self) {
        let keys: Vec<UnitKey> = self.units.iter().map(|u| u.key).collect();
        for key in keys {
            let Some(unit) = self.units.get(key) else {
                continue;
            };
            let bonuses = self.innate_bonuses(unit);
            let movement = unit.movement + bonuses.count(Bonus::Movement);
            let heal = if !unit.acted && unit.can_heal && unit.is_damaged() {
                let in_friendly_city = self
                    .map
                    .get(unit.position)
                    .and_then(|t| t.city.as_ref())
                    .is_some_and(|c| c.owner == unit.owner());
                let base = if in_friendly_city {
                    CITY_HEAL_PERCENT
                } else {
                    FIELD_HEAL_PERCENT
                };
                let pct = (base + bonuses.get(Bonus::Heal)).max(0);
                Some(Fixed::from_num(i64::from(unit.strength) * i64::from(pct)) / Fixed::from_num(100))
            } else {
                None
            };

            if let Some(unit) = self.units.get_mut(key) {
                if let Some(amount) = heal {
                    unit.restore(amount);
                    tracing::debug!(unit = %key, strength = %unit.current_strength, "Unit healed");
                }
                if unit.activity == Activity::Healing && !unit.is_damaged() {
                    unit.activity = Activity::Idle;
                }
                unit.current_movement = movement;
                unit.acted = false;
            }
        }

        self.turn += 1;
        tracing::info!(turn = self.turn, units = self.units.len(), "Turn ended");
        self.events.push(GameEvent::TurnEnded { turn: self.turn });
    }
}
