//! Tile map collaborator.
//!
//! The combat model and the decision policy only see the map through the
//! [`Map`] trait: tile lookup with visibility, coordinate validity, movement
//! cost and path queries. [`GridMap`] is the square-grid implementation used
//! by the game loop, the headless runner and the tests.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::bonus::{Bonus, BonusSet};
use crate::components::{Coords, OwnerId};
use crate::pathfinding;

/// Base terrain of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Terrain {
    /// Open grassland.
    #[default]
    Grassland,
    /// Plains.
    Plains,
    /// Desert.
    Desert,
    /// Tundra.
    Tundra,
    /// Shallow water (impassable for land units).
    Coast,
    /// Deep water (impassable for land units).
    Ocean,
    /// Mountain peak (impassable).
    Peak,
}

impl Terrain {
    /// Whether land units can enter this terrain.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        !matches!(self, Self::Coast | Self::Ocean | Self::Peak)
    }
}

/// Terrain feature layered on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    /// Woodland.
    Forest,
    /// Dense jungle.
    Jungle,
    /// Rolling hills.
    Hills,
}

impl Feature {
    /// Intrinsic defense percent granted to a unit defending on this feature.
    #[must_use]
    pub const fn defense_percent(self) -> i32 {
        match self {
            Self::Forest | Self::Jungle => 50,
            Self::Hills => 25,
        }
    }

    /// The bonus that halves movement cost into this feature.
    #[must_use]
    pub const fn double_move_bonus(self) -> Bonus {
        match self {
            Self::Forest | Self::Jungle => Bonus::ForestDoubleMove,
            Self::Hills => Bonus::HillsDoubleMove,
        }
    }
}

/// A city standing on a tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    /// Owning player.
    pub owner: OwnerId,
    /// Display name.
    pub name: String,
}

/// One map tile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tile {
    /// Base terrain.
    pub terrain: Terrain,
    /// Features present on the tile.
    #[serde(default)]
    pub features: Vec<Feature>,
    /// City on this tile, if any.
    #[serde(default)]
    pub city: Option<City>,
}

impl Tile {
    /// Whether the tile carries a feature.
    #[must_use]
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Snapshot of the combat-relevant properties of this tile.
    #[must_use]
    pub fn combat_features(&self) -> TileFeatures {
        TileFeatures {
            terrain: self.terrain,
            features: self.features.clone(),
            city: self.city.is_some(),
        }
    }
}

/// Combat-relevant view of the defender's tile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TileFeatures {
    /// Base terrain.
    pub terrain: Terrain,
    /// Features on the tile.
    pub features: Vec<Feature>,
    /// Whether a city stands on the tile.
    pub city: bool,
}

impl TileFeatures {
    /// Open ground with no features and no city.
    #[must_use]
    pub fn open() -> Self {
        Self::default()
    }

    /// Whether the tile carries a feature.
    #[must_use]
    pub fn has(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Largest intrinsic defense percent of the tile's features.
    #[must_use]
    pub fn defense_percent(&self) -> i32 {
        self.features
            .iter()
            .map(|f| f.defense_percent())
            .max()
            .unwrap_or(0)
    }
}

/// Map queries consumed by the combat model, the decision policy and movement.
pub trait Map {
    /// Whether the coordinates lie on the map.
    fn valid_coords(&self, coords: Coords) -> bool;

    /// Tile lookup. `None` when off-map or hidden from `viewer`.
    fn tile(&self, coords: Coords, viewer: Option<OwnerId>) -> Option<&Tile>;

    /// Cost in movement points to step from `from` into `to`.
    /// `None` when the step is impossible.
    fn movement_cost(&self, from: Coords, to: Coords, bonuses: &BonusSet) -> Option<u32>;

    /// Steps from `from` (exclusive) to `to` (inclusive). `None` if unreachable.
    fn find_path(&self, from: Coords, to: Coords, bonuses: &BonusSet) -> Option<Vec<Coords>>;

    /// Cities in founding order.
    fn cities(&self) -> Vec<(Coords, &City)>;
}

/// Square tile grid stored in row-major order.
#[derive(Debug, Clone)]
pub struct GridMap {
    rows: i32,
    cols: i32,
    tiles: Vec<Tile>,
    /// City coordinates in founding order.
    city_sites: Vec<Coords>,
    /// Tiles hidden from a given owner.
    hidden: HashSet<(OwnerId, Coords)>,
}

impl GridMap {
    /// Create a map with every tile set to `terrain`.
    ///
    /// # Panics
    ///
    /// Panics if `rows` or `cols` is not positive.
    #[must_use]
    pub fn new(rows: i32, cols: i32, terrain: Terrain) -> Self {
        assert!(rows > 0, "GridMap rows must be positive");
        assert!(cols > 0, "GridMap cols must be positive");

        let count = (rows as usize) * (cols as usize);
        Self {
            rows,
            cols,
            tiles: vec![
                Tile {
                    terrain,
                    ..Tile::default()
                };
                count
            ],
            city_sites: Vec::new(),
            hidden: HashSet::new(),
        }
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> i32 {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> i32 {
        self.cols
    }

    #[inline]
    fn index(&self, coords: Coords) -> Option<usize> {
        self.valid_coords(coords)
            .then(|| (coords.row as usize) * (self.cols as usize) + (coords.col as usize))
    }

    /// Tile lookup ignoring visibility.
    #[must_use]
    pub fn get(&self, coords: Coords) -> Option<&Tile> {
        self.index(coords).map(|i| &self.tiles[i])
    }

    fn get_mut(&mut self, coords: Coords) -> Option<&mut Tile> {
        self.index(coords).map(|i| &mut self.tiles[i])
    }

    /// Set the base terrain of a tile. Returns `false` if off-map.
    pub fn set_terrain(&mut self, coords: Coords, terrain: Terrain) -> bool {
        match self.get_mut(coords) {
            Some(tile) => {
                tile.terrain = terrain;
                true
            }
            None => false,
        }
    }

    /// Add a feature to a tile. Returns `false` if off-map.
    pub fn add_feature(&mut self, coords: Coords, feature: Feature) -> bool {
        match self.get_mut(coords) {
            Some(tile) => {
                if !tile.features.contains(&feature) {
                    tile.features.push(feature);
                }
                true
            }
            None => false,
        }
    }

    /// Place a city. Returns `false` if off-map, impassable or already a city.
    pub fn found_city(&mut self, coords: Coords, owner: OwnerId, name: impl Into<String>) -> bool {
        let Some(tile) = self.get_mut(coords) else {
            return false;
        };
        if tile.city.is_some() || !tile.terrain.is_passable() {
            return false;
        }
        tile.city = Some(City {
            owner,
            name: name.into(),
        });
        self.city_sites.push(coords);
        true
    }

    /// Hide a tile from an owner.
    pub fn hide(&mut self, owner: OwnerId, coords: Coords) {
        self.hidden.insert((owner, coords));
    }

    /// Reveal a previously hidden tile.
    pub fn reveal(&mut self, owner: OwnerId, coords: Coords) {
        self.hidden.remove(&(owner, coords));
    }

    /// Whether a tile is visible to an owner.
    #[must_use]
    pub fn is_visible(&self, owner: OwnerId, coords: Coords) -> bool {
        !self.hidden.contains(&(owner, coords))
    }

    /// Whether a land unit may stand on the tile.
    #[must_use]
    pub fn is_passable(&self, coords: Coords) -> bool {
        self.get(coords).is_some_and(|t| t.terrain.is_passable())
    }

    /// Movement cost to enter a tile, independent of the origin.
    #[must_use]
    pub fn entry_cost(&self, coords: Coords, bonuses: &BonusSet) -> Option<u32> {
        let tile = self.get(coords)?;
        if !tile.terrain.is_passable() {
            return None;
        }
        let cost = tile
            .features
            .iter()
            .map(|f| if bonuses.has(f.double_move_bonus()) { 1 } else { 2 })
            .max()
            .unwrap_or(1);
        Some(cost)
    }
}

impl Map for GridMap {
    fn valid_coords(&self, coords: Coords) -> bool {
        coords.row >= 0 && coords.col >= 0 && coords.row < self.rows && coords.col < self.cols
    }

    fn tile(&self, coords: Coords, viewer: Option<OwnerId>) -> Option<&Tile> {
        if let Some(owner) = viewer {
            if !self.is_visible(owner, coords) {
                return None;
            }
        }
        self.get(coords)
    }

    fn movement_cost(&self, from: Coords, to: Coords, bonuses: &BonusSet) -> Option<u32> {
        if !from.is_adjacent(to) {
            return None;
        }
        self.entry_cost(to, bonuses)
    }

    fn find_path(&self, from: Coords, to: Coords, bonuses: &BonusSet) -> Option<Vec<Coords>> {
        pathfinding::find_path(self, from, to, bonuses)
    }

    fn cities(&self) -> Vec<(Coords, &City)> {
        self.city_sites
            .iter()
            .filter_map(|&c| self.get(c).and_then(|t| t.city.as_ref()).map(|city| (c, city)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_coords() {
        let map = GridMap::new(4, 6, Terrain::Grassland);
        assert!(map.valid_coords(Coords::new(0, 0)));
        assert!(map.valid_coords(Coords::new(3, 5)));
        assert!(!map.valid_coords(Coords::new(4, 0)));
        assert!(!map.valid_coords(Coords::new(0, 6)));
        assert!(!map.valid_coords(Coords::new(-1, 2)));
    }

    #[test]
    fn test_feature_costs() {
        let mut map = GridMap::new(3, 3, Terrain::Grassland);
        map.add_feature(Coords::new(1, 1), Feature::Forest);
        map.add_feature(Coords::new(1, 2), Feature::Hills);
        map.set_terrain(Coords::new(2, 2), Terrain::Ocean);

        let none = BonusSet::new();
        let origin = Coords::new(0, 1);
        assert_eq!(map.movement_cost(origin, Coords::new(0, 2), &none), Some(1));
        assert_eq!(map.movement_cost(origin, Coords::new(1, 1), &none), Some(2));
        assert_eq!(map.movement_cost(origin, Coords::new(1, 2), &none), Some(2));
        assert_eq!(map.movement_cost(Coords::new(1, 1), Coords::new(2, 2), &none), None);
        // Not adjacent
        assert_eq!(map.movement_cost(origin, Coords::new(2, 1), &none), None);

        let mut woodsman = BonusSet::new();
        woodsman.add(Bonus::ForestDoubleMove, 1);
        assert_eq!(map.movement_cost(origin, Coords::new(1, 1), &woodsman), Some(1));
        assert_eq!(map.movement_cost(origin, Coords::new(1, 2), &woodsman), Some(2));
    }

    #[test]
    fn test_hidden_tiles() {
        let mut map = GridMap::new(3, 3, Terrain::Plains);
        let c = Coords::new(1, 1);
        map.hide(OwnerId::BARBARIAN, c);
        assert!(map.tile(c, Some(OwnerId::BARBARIAN)).is_none());
        assert!(map.tile(c, Some(OwnerId(0))).is_some());
        assert!(map.tile(c, None).is_some());
        map.reveal(OwnerId::BARBARIAN, c);
        assert!(map.tile(c, Some(OwnerId::BARBARIAN)).is_some());
    }

    #[test]
    fn test_cities_in_founding_order() {
        let mut map = GridMap::new(5, 5, Terrain::Grassland);
        assert!(map.found_city(Coords::new(4, 4), OwnerId(0), "Second"));
        assert!(map.found_city(Coords::new(0, 0), OwnerId(1), "Third"));
        assert!(!map.found_city(Coords::new(0, 0), OwnerId(1), "Duplicate"));

        let cities = map.cities();
        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].0, Coords::new(4, 4));
        assert_eq!(cities[1].1.name, "Third");
    }

    #[test]
    fn test_tile_features_defense() {
        let mut tile = TileFeatures::open();
        assert_eq!(tile.defense_percent(), 0);
        tile.features = vec![Feature::Hills, Feature::Forest];
        assert_eq!(tile.defense_percent(), 50);
    }
}
