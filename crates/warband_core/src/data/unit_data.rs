//! Unit type definitions for data-driven unit spawning.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::components::{Category, Coords, Unit, UnitKey};
use crate::data::PromotionTable;
use crate::error::{GameError, Result};

/// Data-driven unit type definition.
///
/// # Example RON
///
/// ```ron
/// UnitType(
///     id: "archer",
///     name: "Archer",
///     category: Archery,
///     strength: 3,
///     movement: 1,
///     free_promotions: ["drill1"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitType {
    /// Unique string identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Category tag gating promotions.
    pub category: Category,

    /// Base combat strength.
    pub strength: u32,

    /// Movement points per turn.
    pub movement: u32,

    /// Whether units of this type recover strength by resting.
    #[serde(default = "default_can_heal")]
    pub can_heal: bool,

    /// Promotions granted on spawn. Prerequisites are not required.
    #[serde(default)]
    pub free_promotions: Vec<String>,
}

const fn default_can_heal() -> bool {
    true
}

impl UnitType {
    /// Build a fresh unit of this type.
    #[must_use]
    pub fn instantiate(&self, key: UnitKey, position: Coords) -> Unit {
        let mut unit = Unit::new(
            key,
            self.id.clone(),
            self.category,
            self.strength,
            self.movement,
            position,
        );
        unit.can_heal = self.can_heal;
        for id in &self.free_promotions {
            if !unit.has_promotion(id) {
                unit.promotions.push(id.clone());
            }
        }
        unit
    }
}

/// Serialized form of the unit type table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "UnitTypeTable")]
struct UnitTypeTableData {
    version: u32,
    units: Vec<UnitType>,
}

/// Largest base strength a unit type may declare.
pub const MAX_UNIT_STRENGTH: u32 = 10_000;

/// All unit types, validated once at load.
#[derive(Debug, Clone)]
pub struct UnitTypeTable {
    version: u32,
    units: Vec<UnitType>,
    index: HashMap<String, usize>,
}

/// The unit table shipped with the game.
const EMBEDDED_UNITS: &str = include_str!("../../../../assets/data/units.ron");

impl UnitTypeTable {
    /// Build and validate a table.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidData`] listing every problem found.
    pub fn new(version: u32, units: Vec<UnitType>) -> Result<Self> {
        let mut errors = Vec::new();
        let mut seen = BTreeSet::new();
        for unit in &units {
            if unit.id.is_empty() {
                errors.push("unit type with empty id".to_string());
            }
            if !seen.insert(unit.id.as_str()) {
                errors.push(format!("duplicate unit type id '{}'", unit.id));
            }
            if unit.strength == 0 {
                errors.push(format!("unit type '{}' has zero strength", unit.id));
            }
            if unit.strength > MAX_UNIT_STRENGTH {
                errors.push(format!(
                    "unit type '{}' strength {} exceeds {MAX_UNIT_STRENGTH}",
                    unit.id, unit.strength
                ));
            }
        }
        if !errors.is_empty() {
            return Err(GameError::InvalidData(errors));
        }

        let index = units
            .iter()
            .enumerate()
            .map(|(i, u)| (u.id.clone(), i))
            .collect();
        Ok(Self {
            version,
            units,
            index,
        })
    }

    /// Parse and validate a RON document.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] on malformed RON and
    /// [`GameError::InvalidData`] on failed validation.
    pub fn from_ron_str(source_name: &str, ron_text: &str) -> Result<Self> {
        let data: UnitTypeTableData =
            ron::from_str(ron_text).map_err(|e| GameError::DataParseError {
                path: source_name.to_string(),
                message: e.to_string(),
            })?;
        let table = Self::new(data.version, data.units)?;
        tracing::debug!(
            source = source_name,
            version = table.version,
            count = table.len(),
            "Loaded unit type table"
        );
        Ok(table)
    }

    /// The table shipped with the game.
    ///
    /// # Errors
    ///
    /// Fails only if the embedded data is broken.
    pub fn embedded() -> Result<Self> {
        Self::from_ron_str("embedded:units.ron", EMBEDDED_UNITS)
    }

    /// Check that every free promotion exists and suits its unit's category.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidData`] listing every mismatch.
    pub fn check_promotions(&self, promotions: &PromotionTable) -> Result<()> {
        let mut errors = Vec::new();
        for unit in &self.units {
            for id in &unit.free_promotions {
                match promotions.get(id) {
                    None => errors.push(format!(
                        "unit type '{}' grants unknown promotion '{id}'",
                        unit.id
                    )),
                    Some(p) if !p.allows(unit.category) => errors.push(format!(
                        "unit type '{}' grants '{id}', not available to {:?}",
                        unit.id, unit.category
                    )),
                    Some(_) => {}
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GameError::InvalidData(errors))
        }
    }

    /// Table version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Look up a unit type by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&UnitType> {
        self.index.get(id).map(|&i| &self.units[i])
    }

    /// All unit types in file order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitType> {
        self.units.iter()
    }

    /// Number of unit types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{OwnerId, UnitId};

    fn create_test_unit_type() -> UnitType {
        UnitType {
            id: "archer".to_string(),
            name: "Archer".to_string(),
            category: Category::Archery,
            strength: 3,
            movement: 1,
            can_heal: true,
            free_promotions: vec!["drill1".to_string()],
        }
    }

    #[test]
    fn test_instantiate_applies_free_promotions() {
        let archer = create_test_unit_type();
        let unit = archer.instantiate(UnitKey::new(OwnerId(0), UnitId(7)), Coords::new(1, 2));
        assert_eq!(unit.strength, 3);
        assert_eq!(unit.position, Coords::new(1, 2));
        assert_eq!(unit.promotions, vec!["drill1".to_string()]);
        assert!(!unit.is_damaged());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = UnitTypeTable::new(1, vec![create_test_unit_type(), create_test_unit_type()])
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidData(_)));
    }

    #[test]
    fn test_zero_strength_rejected() {
        let mut unit = create_test_unit_type();
        unit.strength = 0;
        assert!(UnitTypeTable::new(1, vec![unit]).is_err());
    }

    #[test]
    fn test_oversized_strength_rejected() {
        let text = r#"UnitTypeTable(
            version: 1,
            units: [
                UnitType(id: "titan", name: "Titan", category: Melee, strength: 30000000, movement: 1),
            ],
        )"#;
        let err = UnitTypeTable::from_ron_str("units.ron", text).unwrap_err();
        let GameError::InvalidData(errors) = err else {
            panic!("expected InvalidData, got {err}");
        };
        assert!(errors[0].contains("titan"));

        let mut strongest = create_test_unit_type();
        strongest.strength = MAX_UNIT_STRENGTH;
        assert!(UnitTypeTable::new(1, vec![strongest]).is_ok());
    }

    #[test]
    fn test_can_heal_defaults_to_true() {
        let text = r#"UnitType(id: "scout", name: "Scout", category: Recon, strength: 1, movement: 2)"#;
        let unit: UnitType = ron::from_str(text).unwrap();
        assert!(unit.can_heal);
        assert!(unit.free_promotions.is_empty());
    }

    #[test]
    fn test_embedded_tables_agree() {
        let promotions = PromotionTable::embedded().unwrap();
        let units = UnitTypeTable::embedded().unwrap();
        assert!(units.get("warrior").is_some());
        units.check_promotions(&promotions).unwrap();
    }

    #[test]
    fn test_free_promotion_category_mismatch() {
        let promotions = PromotionTable::embedded().unwrap();
        let mut scout = create_test_unit_type();
        scout.category = Category::Recon;
        scout.free_promotions = vec!["city_raider1".to_string()];
        let table = UnitTypeTable::new(1, vec![scout]).unwrap();
        assert!(table.check_promotions(&promotions).is_err());
    }
}
