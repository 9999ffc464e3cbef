//! Unit storage.
//!
//! Units are keyed by [`UnitKey`] in a `BTreeMap`, so iteration is always in
//! (owner, id) order. Ids are unique across all owners. The combat model and
//! the decision policy only read and write units through this interface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{Coords, OwnerId, Unit, UnitId, UnitKey};
use crate::data::UnitType;

/// Storage for all units in the game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitRegistry {
    /// Map of unit key to unit data.
    units: BTreeMap<UnitKey, Unit>,
    /// Next unit id to assign.
    next_id: u64,
}

impl UnitRegistry {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn allocate(&mut self, owner: OwnerId) -> UnitKey {
        let id = UnitId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        UnitKey::new(owner, id)
    }

    /// Spawn a unit of the given type and return its key.
    pub fn spawn(&mut self, owner: OwnerId, unit_type: &UnitType, position: Coords) -> UnitKey {
        let key = self.allocate(owner);
        let unit = unit_type.instantiate(key, position);
        self.units.insert(key, unit);
        key
    }

    /// Remove a unit.
    pub fn remove(&mut self, key: UnitKey) -> Option<Unit> {
        self.units.remove(&key)
    }

    /// Get a unit by key.
    #[must_use]
    pub fn get(&self, key: UnitKey) -> Option<&Unit> {
        self.units.get(&key)
    }

    /// Get a mutable reference to a unit.
    pub fn get_mut(&mut self, key: UnitKey) -> Option<&mut Unit> {
        self.units.get_mut(&key)
    }

    /// Check if a unit exists.
    #[must_use]
    pub fn contains(&self, key: UnitKey) -> bool {
        self.units.contains_key(&key)
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Iterate over all units in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Units standing on a tile, in key order.
    pub fn units_at(&self, coords: Coords) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(move |u| u.position == coords)
    }

    /// Keys of an owner's units, ascending by id.
    #[must_use]
    pub fn units_of(&self, owner: OwnerId) -> Vec<UnitKey> {
        let mut keys: Vec<_> = self
            .units
            .keys()
            .filter(|k| k.owner == owner)
            .copied()
            .collect();
        keys.sort_unstable_by_key(|k| k.id);
        keys
    }

    /// Owners with at least one unit, ascending.
    #[must_use]
    pub fn owners(&self) -> Vec<OwnerId> {
        let mut owners: Vec<_> = self.units.keys().map(|k| k.owner).collect();
        owners.dedup();
        owners
    }

    /// Number of `owner`'s units on a tile.
    #[must_use]
    pub fn friendly_count_at(&self, coords: Coords, owner: OwnerId) -> usize {
        self.units_at(coords).filter(|u| u.owner() == owner).count()
    }

    /// Whether a tile holds a unit not owned by `owner`.
    #[must_use]
    pub fn has_enemy_at(&self, coords: Coords, owner: OwnerId) -> bool {
        self.units_at(coords).any(|u| u.owner() != owner)
    }
}
