//! Test fixtures and helpers.
//!
//! Pre-built maps, unit types and games for consistent testing.

use warband_core::components::{Category, Coords, OwnerId, Unit, UnitId, UnitKey};
use warband_core::data::{PromotionTable, UnitType, UnitTypeTable};
use warband_core::game::Game;
use warband_core::map::{GridMap, Terrain};
use warband_core::math::Fixed;
use warband_core::registry::UnitRegistry;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> Fixed {
    Fixed::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: game code never builds strengths from floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> Fixed {
    Fixed::from_num(n)
}

/// The shipped promotion table.
///
/// # Panics
///
/// Panics if the embedded data does not parse.
#[must_use]
pub fn promotion_table() -> PromotionTable {
    PromotionTable::embedded().expect("embedded promotions parse")
}

/// The shipped unit type table.
///
/// # Panics
///
/// Panics if the embedded data does not parse.
#[must_use]
pub fn unit_type_table() -> UnitTypeTable {
    UnitTypeTable::embedded().expect("embedded unit types parse")
}

/// A plain unit type with no free promotions.
#[must_use]
pub fn unit_type(category: Category, strength: u32, movement: u32) -> UnitType {
    UnitType {
        id: format!("{category:?}_{strength}").to_lowercase(),
        name: format!("{category:?} ({strength})"),
        category,
        strength,
        movement,
        can_heal: true,
        free_promotions: Vec::new(),
    }
}

/// A melee unit with the given strength, not stored anywhere.
#[must_use]
pub fn melee_unit(owner: OwnerId, id: u64, strength: u32) -> Unit {
    Unit::new(
        UnitKey::new(owner, UnitId(id)),
        "melee",
        Category::Melee,
        strength,
        1,
        Coords::new(0, 0),
    )
}

/// Spawn a one-move melee unit of the given strength into a registry.
pub fn spawn_melee(
    units: &mut UnitRegistry,
    owner: OwnerId,
    strength: u32,
    position: Coords,
) -> UnitKey {
    units.spawn(owner, &unit_type(Category::Melee, strength, 1), position)
}

/// An all-grassland map.
#[must_use]
pub fn open_map(rows: i32, cols: i32) -> GridMap {
    GridMap::new(rows, cols, Terrain::Grassland)
}

/// A map whose only passable tile is `center`.
#[must_use]
pub fn island_map(rows: i32, cols: i32, center: Coords) -> GridMap {
    let mut map = GridMap::new(rows, cols, Terrain::Ocean);
    map.set_terrain(center, Terrain::Grassland);
    map
}

/// A game on an open map with the shipped data.
///
/// # Panics
///
/// Panics if the embedded data does not parse.
#[must_use]
pub fn open_game(rows: i32, cols: i32, seed: u64) -> Game {
    Game::new(open_map(rows, cols), seed).expect("embedded data is consistent")
}

/// Two opposing players with warriors around a barbarian camp.
///
/// Player 0 holds a city at (1, 1); barbarians camp at the far corner.
///
/// # Panics
///
/// Panics if the embedded data does not parse.
#[must_use]
pub fn skirmish_game(seed: u64) -> Game {
    let mut game = open_game(10, 10, seed);
    game.map_mut().found_city(Coords::new(1, 1), OwnerId(0), "Capital");
    game.map_mut()
        .found_city(Coords::new(8, 8), OwnerId::BARBARIAN, "Camp");

    for (owner, type_id, coords) in [
        (OwnerId(0), "warrior", Coords::new(1, 1)),
        (OwnerId(0), "archer", Coords::new(1, 1)),
        (OwnerId(0), "axeman", Coords::new(2, 3)),
        (OwnerId::BARBARIAN, "warrior", Coords::new(8, 8)),
        (OwnerId::BARBARIAN, "axeman", Coords::new(6, 6)),
        (OwnerId::BARBARIAN, "chariot", Coords::new(5, 7)),
        (OwnerId::BARBARIAN, "spearman", Coords::new(4, 4)),
    ] {
        game.spawn_unit(owner, type_id, coords)
            .expect("fixture placement is valid");
    }
    game
}

#[cfg(test)]
mod tests {
    use super::*;
    use warband_core::map::Map;

    #[test]
    fn test_skirmish_fixture() {
        let game = skirmish_game(0);
        assert_eq!(game.units().len(), 7);
        assert_eq!(game.units().units_of(OwnerId::BARBARIAN).len(), 4);
        assert_eq!(game.map().cities().len(), 2);
    }

    #[test]
    fn test_island_map() {
        let map = island_map(3, 3, Coords::new(1, 1));
        assert!(map.is_passable(Coords::new(1, 1)));
        assert!(!map.is_passable(Coords::new(0, 0)));
    }
}
