//! Unit and board primitives.
//!
//! Components are plain data. Behaviour that needs the promotion table,
//! the map or the registry lives in the modules that own those.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};

/// Player (or faction) owning units and cities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub u32);

impl OwnerId {
    /// The barbarian faction, driven by the reactive decision policy.
    pub const BARBARIAN: Self = Self(u32::MAX);

    /// Whether this is the barbarian faction.
    #[must_use]
    pub const fn is_barbarian(self) -> bool {
        self.0 == Self::BARBARIAN.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_barbarian() {
            f.write_str("barbarians")
        } else {
            write!(f, "player {}", self.0)
        }
    }
}

/// Unique identifier for units, unique across all owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u64);

/// Registry key for a unit: the owner plus the unit id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    /// Owning player.
    pub owner: OwnerId,
    /// Unit id.
    pub id: UnitId,
}

impl UnitKey {
    /// Create a new key.
    #[must_use]
    pub const fn new(owner: OwnerId, id: UnitId) -> Self {
        Self { owner, id }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.id.0, self.owner)
    }
}

/// Tile coordinates on the square grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Coords {
    /// Row index (north is lower).
    pub row: i32,
    /// Column index (west is lower).
    pub col: i32,
}

/// Offsets for the eight compass directions, clockwise from north.
pub const COMPASS: [(i32, i32); 8] = [
    (-1, 0),  // N
    (-1, 1),  // NE
    (0, 1),   // E
    (1, 1),   // SE
    (1, 0),   // S
    (1, -1),  // SW
    (0, -1),  // W
    (-1, -1), // NW
];

impl Coords {
    /// Create new coordinates.
    #[must_use]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Chebyshev (king-move) distance.
    #[must_use]
    pub fn chebyshev(self, other: Self) -> u32 {
        self.row.abs_diff(other.row).max(self.col.abs_diff(other.col))
    }

    /// Whether `other` is exactly one king move away.
    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        self.chebyshev(other) == 1
    }

    /// Offset by a `(row, col)` delta.
    #[must_use]
    pub const fn offset(self, delta: (i32, i32)) -> Self {
        Self::new(self.row + delta.0, self.col + delta.1)
    }

    /// The eight neighbouring coordinates in [`COMPASS`] order.
    ///
    /// Neighbours may lie off the map; callers check validity.
    pub fn neighbors(self) -> impl Iterator<Item = Coords> {
        COMPASS.into_iter().map(move |d| self.offset(d))
    }

    /// All coordinates within `radius` (Chebyshev), row by row, excluding self.
    pub fn within(self, radius: i32) -> impl Iterator<Item = Coords> {
        (-radius..=radius).flat_map(move |dr| {
            (-radius..=radius)
                .filter(move |&dc| dr != 0 || dc != 0)
                .map(move |dc| self.offset((dr, dc)))
        })
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Unit category, gating which promotions a unit may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Foot soldiers fighting hand to hand.
    Melee,
    /// Bows and slings.
    Archery,
    /// Horse and chariot units.
    Mounted,
    /// Catapults and rams.
    Siege,
    /// Scouts and explorers.
    Recon,
}

/// What a unit is doing while it holds its tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Activity {
    /// No standing order.
    #[default]
    Idle,
    /// Dug in, holding position.
    Fortified,
    /// Resting to recover strength.
    Healing,
}

/// A unit on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Registry key (owner + id).
    pub key: UnitKey,
    /// Unit type id from the unit table.
    pub type_id: String,
    /// Category tag.
    pub category: Category,
    /// Base strength (always at least 1).
    pub strength: u32,
    /// Remaining strength, `0 <= current_strength <= strength`.
    #[serde(with = "fixed_serde")]
    pub current_strength: Fixed,
    /// Movement points per turn.
    pub movement: u32,
    /// Movement points left this turn.
    pub current_movement: u32,
    /// Tile the unit stands on.
    pub position: Coords,
    /// Acquired promotions in acquisition order, no duplicates.
    pub promotions: Vec<String>,
    /// Whether the unit type may recover strength by resting.
    pub can_heal: bool,
    /// Standing activity.
    pub activity: Activity,
    /// Whether the unit moved or fought this turn.
    pub acted: bool,
}

impl Unit {
    /// Create a unit at full strength and movement.
    #[must_use]
    pub fn new(
        key: UnitKey,
        type_id: impl Into<String>,
        category: Category,
        strength: u32,
        movement: u32,
        position: Coords,
    ) -> Self {
        let strength = strength.max(1);
        Self {
            key,
            type_id: type_id.into(),
            category,
            strength,
            current_strength: Fixed::from_num(strength),
            movement,
            current_movement: movement,
            position,
            promotions: Vec::new(),
            can_heal: true,
            activity: Activity::Idle,
            acted: false,
        }
    }

    /// Owning player.
    #[must_use]
    pub const fn owner(&self) -> OwnerId {
        self.key.owner
    }

    /// Whether the unit has a promotion.
    #[must_use]
    pub fn has_promotion(&self, id: &str) -> bool {
        self.promotions.iter().any(|p| p == id)
    }

    /// Whether the unit is below full strength.
    #[must_use]
    pub fn is_damaged(&self) -> bool {
        self.current_strength < Fixed::from_num(self.strength)
    }

    /// Whether the unit is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.current_strength > Fixed::ZERO
    }

    /// Health on the 0-100 scale used by the combat model, rounded.
    ///
    /// A living unit never reports 0 so its modified strength stays positive.
    #[must_use]
    pub fn health_percent(&self) -> u32 {
        if !self.is_alive() {
            return 0;
        }
        let fraction = self.current_strength / Fixed::from_num(self.strength);
        let scaled = (fraction * Fixed::from_num(100)).round().to_num::<i64>();
        scaled.clamp(1, 100) as u32
    }

    /// Whether the unit belongs to a different owner.
    #[must_use]
    pub fn is_enemy_of(&self, other: &Unit) -> bool {
        self.owner() != other.owner()
    }

    /// Restore strength, capped at full.
    pub fn restore(&mut self, amount: Fixed) {
        let full = Fixed::from_num(self.strength);
        self.current_strength = (self.current_strength + amount).min(full);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(strength: u32) -> Unit {
        Unit::new(
            UnitKey::new(OwnerId(0), UnitId(1)),
            "warrior",
            Category::Melee,
            strength,
            1,
            Coords::new(0, 0),
        )
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = Coords::new(2, 2);
        assert_eq!(a.chebyshev(Coords::new(2, 2)), 0);
        assert_eq!(a.chebyshev(Coords::new(3, 3)), 1);
        assert_eq!(a.chebyshev(Coords::new(5, 0)), 3);
        assert!(a.is_adjacent(Coords::new(1, 3)));
        assert!(!a.is_adjacent(Coords::new(0, 2)));
    }

    #[test]
    fn test_neighbors_are_all_adjacent() {
        let c = Coords::new(4, 4);
        let n: Vec<_> = c.neighbors().collect();
        assert_eq!(n.len(), 8);
        assert!(n.iter().all(|&x| c.is_adjacent(x)));
        assert_eq!(n[0], Coords::new(3, 4));
    }

    #[test]
    fn test_within_radius() {
        let c = Coords::new(0, 0);
        let tiles: Vec<_> = c.within(3).collect();
        assert_eq!(tiles.len(), 48);
        assert!(tiles.iter().all(|&t| t.chebyshev(c) <= 3 && t != c));
        // Row-major scan order
        assert_eq!(tiles[0], Coords::new(-3, -3));
    }

    #[test]
    fn test_health_percent() {
        let mut u = unit(4);
        assert_eq!(u.health_percent(), 100);
        u.current_strength = Fixed::from_num(1);
        assert_eq!(u.health_percent(), 25);
        u.current_strength = Fixed::from_num(0.001);
        assert_eq!(u.health_percent(), 1);
        u.current_strength = Fixed::ZERO;
        assert_eq!(u.health_percent(), 0);
    }

    #[test]
    fn test_restore_caps_at_full() {
        let mut u = unit(2);
        u.current_strength = Fixed::from_num(1);
        assert!(u.is_damaged());
        u.restore(Fixed::from_num(5));
        assert_eq!(u.current_strength, Fixed::from_num(2));
        assert!(!u.is_damaged());
    }

    #[test]
    fn test_barbarian_owner() {
        assert!(OwnerId::BARBARIAN.is_barbarian());
        assert!(!OwnerId(0).is_barbarian());
        assert_eq!(OwnerId::BARBARIAN.to_string(), "barbarians");
    }
}
