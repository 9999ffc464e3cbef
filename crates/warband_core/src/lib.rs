//! # Warband Core
//!
//! Deterministic rules core for a turn-based tactics game with barbarian AI.
//!
//! This crate contains **only** game logic:
//! - No rendering
//! - No IO beyond parsing embedded data
//! - No system randomness (every draw comes from an injected, seeded `Rng`)
//! - Fixed-point strengths and probabilities
//!
//! ## Crate Structure
//!
//! - [`components`] - Unit, owner and coordinate types
//! - [`bonus`] - Bonus kinds and their resolution for a fight
//! - [`data`] - Promotion and unit type tables
//! - [`promotions`] - Promotion eligibility and acquisition
//! - [`combat`] - Closed-form strength, damage and odds
//! - [`battle`] - Round-by-round fight simulation
//! - [`map`] - Tile grid and the map query trait
//! - [`pathfinding`] - A* search and the path request queue
//! - [`registry`] - Unit storage
//! - [`ai`] - Barbarian decision ladder
//! - [`game`] - Turn loop and the unit action API

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod battle;
pub mod bonus;
pub mod combat;
pub mod components;
pub mod data;
pub mod error;
pub mod game;
pub mod map;
pub mod math;
pub mod pathfinding;
pub mod promotions;
pub mod registry;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{AiAction, Decision, DecisionContext, DecisionPolicy, LadderRule};
    pub use crate::battle::{Battle, BattleSimulator, Phase, Round};
    pub use crate::bonus::{BattleContext, Bonus, BonusResolver, BonusSet, Side};
    pub use crate::combat::{CombatModel, CombatOdds};
    pub use crate::components::{Activity, Category, Coords, OwnerId, Unit, UnitId, UnitKey};
    pub use crate::data::{PromotionData, PromotionTable, UnitType, UnitTypeTable};
    pub use crate::error::{GameError, MoveRejection, PromotionRejection, Result};
    pub use crate::game::{BattleReport, Game, GameEvent, Order};
    pub use crate::map::{Feature, GridMap, Map, Terrain, TileFeatures};
    pub use crate::math::Fixed;
    pub use crate::pathfinding::{PathIntent, PathQueue, PathTicket};
    pub use crate::registry::UnitRegistry;
}
