//! Scenario loading and configuration.
//!
//! Scenarios define the initial game state for headless runs: map size and
//! terrain, cities, starting units with their promotions, and the seed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use warband_core::components::{Coords, OwnerId};
use warband_core::data::{PromotionTable, UnitTypeTable};
use warband_core::error::GameError;
use warband_core::game::Game;
use warband_core::map::{Feature, GridMap, Map, Terrain};

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The map dimensions are unusable.
    #[error("Invalid map size {0:?}")]
    InvalidMapSize((i32, i32)),
    /// The game rejected part of the setup.
    #[error("Scenario setup failed: {0}")]
    Setup(#[from] GameError),
}

/// Who controls a city or unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// A numbered player.
    Player(u32),
    /// The barbarians.
    Barbarian,
}

impl Side {
    /// The owner id in the game.
    #[must_use]
    pub const fn owner(self) -> OwnerId {
        match self {
            Self::Player(id) => OwnerId(id),
            Self::Barbarian => OwnerId::BARBARIAN,
        }
    }
}

/// A rectangle of terrain and features, corners inclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainPatch {
    /// Top-left corner (row, col).
    pub from: (i32, i32),
    /// Bottom-right corner (row, col).
    pub to: (i32, i32),
    /// Replacement terrain, if any.
    #[serde(default)]
    pub terrain: Option<Terrain>,
    /// Features added to every tile.
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// A city placed at setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityPlacement {
    /// City name.
    pub name: String,
    /// Owner.
    pub owner: Side,
    /// Position (row, col).
    pub position: (i32, i32),
}

fn one() -> u32 {
    1
}

/// Starting units of one type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Unit type id.
    pub unit_type: String,
    /// Owner.
    pub owner: Side,
    /// Position (row, col).
    pub position: (i32, i32),
    /// Promotions acquired in order after spawning.
    #[serde(default)]
    pub promotions: Vec<String>,
    /// Number of units to place.
    #[serde(default = "one")]
    pub count: u32,
}

impl UnitPlacement {
    /// Create a placement of one unit.
    #[must_use]
    pub fn new(unit_type: &str, owner: Side, row: i32, col: i32) -> Self {
        Self {
            unit_type: unit_type.to_string(),
            owner,
            position: (row, col),
            promotions: Vec::new(),
            count: 1,
        }
    }

    /// Add promotions to acquire after spawning.
    #[must_use]
    pub fn with_promotions(mut self, promotions: &[&str]) -> Self {
        self.promotions = promotions.iter().map(|p| (*p).to_string()).collect();
        self
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Map dimensions (rows, cols).
    pub map_size: (i32, i32),
    /// Base terrain.
    #[serde(default)]
    pub terrain: Terrain,
    /// Terrain patches applied in order.
    #[serde(default)]
    pub patches: Vec<TerrainPatch>,
    /// Cities, founded in order.
    #[serde(default)]
    pub cities: Vec<CityPlacement>,
    /// Starting units.
    pub units: Vec<UnitPlacement>,
    /// Players besides the barbarians that the AI controls.
    #[serde(default)]
    pub ai_players: Vec<u32>,
    /// Default random seed.
    #[serde(default)]
    pub seed: u64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::border_raid()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// A player town on the edge of barbarian land.
    #[must_use]
    pub fn border_raid() -> Self {
        Self {
            name: "Border Raid".to_string(),
            description: "Barbarians from a forest camp raid a frontier town".to_string(),
            map_size: (12, 12),
            terrain: Terrain::Grassland,
            patches: vec![
                TerrainPatch {
                    from: (6, 6),
                    to: (11, 11),
                    terrain: None,
                    features: vec![Feature::Forest],
                },
                TerrainPatch {
                    from: (0, 5),
                    to: (3, 6),
                    terrain: None,
                    features: vec![Feature::Hills],
                },
                TerrainPatch {
                    from: (11, 0),
                    to: (11, 4),
                    terrain: Some(Terrain::Coast),
                    features: Vec::new(),
                },
            ],
            cities: vec![
                CityPlacement {
                    name: "Frontier".to_string(),
                    owner: Side::Player(0),
                    position: (2, 2),
                },
                CityPlacement {
                    name: "Camp".to_string(),
                    owner: Side::Barbarian,
                    position: (9, 9),
                },
            ],
            units: vec![
                UnitPlacement::new("archer", Side::Player(0), 2, 2),
                UnitPlacement::new("spearman", Side::Player(0), 2, 2),
                UnitPlacement::new("warrior", Side::Player(0), 3, 5).with_promotions(&["combat1"]),
                UnitPlacement {
                    count: 3,
                    ..UnitPlacement::new("warrior", Side::Barbarian, 9, 9)
                },
                UnitPlacement::new("axeman", Side::Barbarian, 7, 7),
                UnitPlacement::new("archer", Side::Barbarian, 6, 8),
                UnitPlacement::new("chariot", Side::Barbarian, 5, 5),
            ],
            ai_players: Vec::new(),
            seed: 0,
        }
    }

    /// Owners the AI plays for: the barbarians plus any listed players.
    #[must_use]
    pub fn ai_owners(&self) -> Vec<OwnerId> {
        let mut owners: Vec<OwnerId> = self.ai_players.iter().map(|&id| OwnerId(id)).collect();
        owners.sort_unstable();
        owners.dedup();
        owners.retain(|o| !o.is_barbarian());
        owners.push(OwnerId::BARBARIAN);
        owners
    }

    /// Build the map: base terrain, patches, then cities.
    pub fn build_map(&self) -> Result<GridMap, ScenarioError> {
        let (rows, cols) = self.map_size;
        if rows <= 0 || cols <= 0 {
            return Err(ScenarioError::InvalidMapSize(self.map_size));
        }
        let mut map = GridMap::new(rows, cols, self.terrain);

        for patch in &self.patches {
            for row in patch.from.0..=patch.to.0 {
                for col in patch.from.1..=patch.to.1 {
                    let coords = Coords::new(row, col);
                    if let Some(terrain) = patch.terrain {
                        map.set_terrain(coords, terrain);
                    }
                    for &feature in &patch.features {
                        map.add_feature(coords, feature);
                    }
                }
            }
        }

        for city in &self.cities {
            let coords = Coords::new(city.position.0, city.position.1);
            if !map.found_city(coords, city.owner.owner(), city.name.clone()) {
                return Err(GameError::InvalidPlacement(coords).into());
            }
        }
        Ok(map)
    }

    /// Build a game with the shipped data.
    pub fn build_game(&self, seed: Option<u64>) -> Result<Game, ScenarioError> {
        let game = Game::new(self.build_map()?, seed.unwrap_or(self.seed))?;
        self.populate(game)
    }

    /// Build a game with custom data tables.
    pub fn build_game_with(
        &self,
        tables: DataTables,
        seed: Option<u64>,
    ) -> Result<Game, ScenarioError> {
        let game = Game::with_data(
            self.build_map()?,
            tables.promotions,
            tables.unit_types,
            seed.unwrap_or(self.seed),
        )?;
        self.populate(game)
    }

    fn populate(&self, mut game: Game) -> Result<Game, ScenarioError> {
        for placement in &self.units {
            let coords = Coords::new(placement.position.0, placement.position.1);
            for _ in 0..placement.count {
                let key = game.spawn_unit(placement.owner.owner(), &placement.unit_type, coords)?;
                for promotion in &placement.promotions {
                    game.promote(key, promotion)?;
                }
            }
        }
        tracing::info!(
            scenario = %self.name,
            units = game.units().len(),
            cities = game.map().cities().len(),
            "Scenario loaded"
        );
        Ok(game)
    }
}

/// Promotion and unit type tables loaded together.
#[derive(Debug, Clone)]
pub struct DataTables {
    /// Promotion table.
    pub promotions: PromotionTable,
    /// Unit type table.
    pub unit_types: UnitTypeTable,
}

impl DataTables {
    /// File name of the promotion table in a data directory.
    pub const PROMOTIONS_FILE: &'static str = "promotions.ron";
    /// File name of the unit type table in a data directory.
    pub const UNITS_FILE: &'static str = "units.ron";

    /// The tables compiled into the core crate.
    pub fn embedded() -> Result<Self, ScenarioError> {
        Ok(Self {
            promotions: PromotionTable::embedded()?,
            unit_types: UnitTypeTable::embedded()?,
        })
    }

    /// Load both tables from a directory and cross-check them.
    pub fn load_dir(dir: &Path) -> Result<Self, ScenarioError> {
        let promotions_path: PathBuf = dir.join(Self::PROMOTIONS_FILE);
        let units_path: PathBuf = dir.join(Self::UNITS_FILE);
        let promotions = PromotionTable::from_ron_str(
            &promotions_path.display().to_string(),
            &std::fs::read_to_string(&promotions_path)?,
        )?;
        let unit_types = UnitTypeTable::from_ron_str(
            &units_path.display().to_string(),
            &std::fs::read_to_string(&units_path)?,
        )?;
        unit_types.check_promotions(&promotions)?;
        Ok(Self {
            promotions,
            unit_types,
        })
    }

    /// Load from `dir` when given, otherwise use the embedded tables.
    pub fn load_or_embedded(dir: Option<&Path>) -> Result<Self, ScenarioError> {
        match dir {
            Some(dir) => Self::load_dir(dir),
            None => Self::embedded(),
        }
    }
}
