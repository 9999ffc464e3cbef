//! Error types for the game core.

use std::fmt;

use thiserror::Error;

use crate::components::{Coords, UnitKey};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Why a promotion could not be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionRejection {
    /// No promotion with that id exists in the table.
    Unknown,
    /// The unit already holds the promotion.
    AlreadyHeld,
    /// The promotion is not available to the unit's category.
    IneligibleCategory,
    /// None of the prerequisite groups is satisfied.
    PrerequisitesUnmet,
}

impl fmt::Display for PromotionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unknown => "unknown promotion",
            Self::AlreadyHeld => "already held",
            Self::IneligibleCategory => "not available to this unit category",
            Self::PrerequisitesUnmet => "prerequisites not met",
        };
        f.write_str(text)
    }
}

/// Why a movement or attack order was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    /// Destination is outside the map.
    OffMap,
    /// Destination is not one step away.
    NotAdjacent,
    /// Terrain cannot be entered.
    Impassable,
    /// The unit has no movement points left.
    NoMovementLeft,
    /// A plain move targeted a tile holding enemy units.
    OccupiedByEnemy,
    /// An attack targeted a tile with nothing to attack.
    NoDefender,
    /// No path exists to the destination.
    Unreachable,
}

impl fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::OffMap => "destination is off the map",
            Self::NotAdjacent => "destination is not adjacent",
            Self::Impassable => "terrain is impassable",
            Self::NoMovementLeft => "no movement left",
            Self::OccupiedByEnemy => "tile is occupied by an enemy",
            Self::NoDefender => "no enemy to attack",
            Self::Unreachable => "no path to destination",
        };
        f.write_str(text)
    }
}

/// Top-level error type for all game core errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// A promotion could not be acquired. The unit is unchanged.
    #[error("Cannot acquire promotion '{promotion}': {reason}")]
    InvalidPromotion {
        /// Promotion id that was requested.
        promotion: String,
        /// Rejection reason.
        reason: PromotionRejection,
    },

    /// A movement or attack order was refused. No state was mutated.
    #[error("Illegal move for unit {unit} to {to}: {reason}")]
    IllegalMove {
        /// Unit the order was issued to.
        unit: UnitKey,
        /// Requested destination.
        to: Coords,
        /// Rejection reason.
        reason: MoveRejection,
    },

    /// An internal modelling invariant was broken.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// No unit with that key is registered.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitKey),

    /// A unit cannot be placed on the tile (off the map or impassable).
    #[error("Cannot place a unit on {0}")]
    InvalidPlacement(Coords),

    /// No unit type with that id is defined.
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path (or logical name) of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Data parsed but failed validation.
    #[error("Invalid data: {}", .0.join("; "))]
    InvalidData(Vec<String>),
}

impl GameError {
    /// Build an [`GameError::IllegalMove`].
    #[must_use]
    pub fn illegal_move(unit: UnitKey, to: Coords, reason: MoveRejection) -> Self {
        Self::IllegalMove { unit, to, reason }
    }

    /// Build an [`GameError::InvalidPromotion`].
    #[must_use]
    pub fn invalid_promotion(promotion: &str, reason: PromotionRejection) -> Self {
        Self::InvalidPromotion {
            promotion: promotion.to_string(),
            reason,
        }
    }
}
