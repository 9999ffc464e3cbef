//! Promotion definitions and the versioned promotion table.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::bonus::BonusSet;
use crate::components::Category;
use crate::error::{GameError, Result};

/// Data-driven promotion definition.
///
/// # Example RON
///
/// ```ron
/// PromotionData(
///     id: "combat2",
///     name: "Combat II",
///     abbreviation: "C2",
///     bonuses: { Strength: 10 },
///     categories: [Melee, Archery, Mounted],
///     prerequisites: [["combat1"]],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionData {
    /// Unique string identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Short label for unit flags.
    pub abbreviation: String,

    /// Bonuses granted while held.
    pub bonuses: BonusSet,

    /// Unit categories that may take this promotion.
    pub categories: Vec<Category>,

    /// Alternative prerequisite groups: any one group (OR) must be fully
    /// held (AND). Empty means no prerequisite.
    #[serde(default)]
    pub prerequisites: Vec<Vec<String>>,
}

impl PromotionData {
    /// Whether units of `category` may take this promotion.
    #[must_use]
    pub fn allows(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    /// Whether the held promotion ids satisfy the prerequisite expression.
    #[must_use]
    pub fn prerequisites_met(&self, held: &[String]) -> bool {
        self.prerequisites.is_empty()
            || self
                .prerequisites
                .iter()
                .any(|group| group.iter().all(|req| held.contains(req)))
    }

    /// Every promotion id named anywhere in the prerequisites.
    pub fn prerequisite_ids(&self) -> impl Iterator<Item = &str> {
        self.prerequisites.iter().flatten().map(String::as_str)
    }
}

/// Serialized form of the promotion table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "PromotionTable")]
struct PromotionTableData {
    version: u32,
    promotions: Vec<PromotionData>,
}

/// Largest magnitude a single promotion bonus may carry.
pub const MAX_BONUS_MAGNITUDE: i32 = 1_000;

/// Static promotion configuration, validated once at load.
#[derive(Debug, Clone)]
pub struct PromotionTable {
    version: u32,
    /// Promotions in file order.
    promotions: Vec<PromotionData>,
    index: HashMap<String, usize>,
}

/// The promotion table shipped with the game.
const EMBEDDED_PROMOTIONS: &str = include_str!("../../../../assets/data/promotions.ron");

impl PromotionTable {
    /// Build and validate a table.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidData`] listing every problem found.
    pub fn new(version: u32, promotions: Vec<PromotionData>) -> Result<Self> {
        let errors = validate(&promotions);
        if !errors.is_empty() {
            return Err(GameError::InvalidData(errors));
        }
        let index = promotions
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        Ok(Self {
            version,
            promotions,
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
        let data: PromotionTableData =
            ron::from_str(ron_text).map_err(|e| GameError::DataParseError {
                path: source_name.to_string(),
                message: e.to_string(),
            })?;
        let table = Self::new(data.version, data.promotions)?;
        tracing::debug!(
            source = source_name,
            version = table.version,
            count = table.len(),
            "Loaded promotion table"
        );
        Ok(table)
    }

    /// The table shipped with the game.
    ///
    /// # Errors
    ///
    /// Fails only if the embedded data is broken.
    pub fn embedded() -> Result<Self> {
        Self::from_ron_str("embedded:promotions.ron", EMBEDDED_PROMOTIONS)
    }

    /// Table version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Look up a promotion by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PromotionData> {
        self.index.get(id).map(|&i| &self.promotions[i])
    }

    /// Whether a promotion id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All promotions in file order.
    pub fn iter(&self) -> impl Iterator<Item = &PromotionData> {
        self.promotions.iter()
    }

    /// Number of promotions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.promotions.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.promotions.is_empty()
    }
}

/// Collect every validation problem in a promotion list.
fn validate(promotions: &[PromotionData]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();

    for p in promotions {
        if p.id.is_empty() {
            errors.push("promotion with empty id".to_string());
        }
        *seen.entry(p.id.as_str()).or_insert(0) += 1;
        if p.categories.is_empty() {
            errors.push(format!("'{}' allows no unit category", p.id));
        }
        if p.bonuses.is_empty() {
            errors.push(format!("'{}' grants no bonus", p.id));
        }
        for (bonus, value) in p.bonuses.iter() {
            if value == 0 {
                errors.push(format!("'{}' has zero magnitude for {bonus:?}", p.id));
            }
            if value.abs() > MAX_BONUS_MAGNITUDE {
                errors.push(format!(
                    "'{}' magnitude {value} for {bonus:?} exceeds {MAX_BONUS_MAGNITUDE}",
                    p.id
                ));
            }
            if !bonus.is_grantable() {
                errors.push(format!("'{}' grants reserved bonus {bonus:?}", p.id));
            }
        }
        for group in &p.prerequisites {
            if group.is_empty() {
                errors.push(format!("'{}' has an empty prerequisite group", p.id));
            }
        }
        if p.prerequisite_ids().any(|req| req == p.id) {
            errors.push(format!("'{}' lists itself as a prerequisite", p.id));
        }
    }

    for (id, count) in &seen {
        if *count > 1 {
            errors.push(format!("duplicate promotion id '{id}'"));
        }
    }

    for p in promotions {
        for req in p.prerequisite_ids() {
            if !seen.contains_key(req) {
                errors.push(format!("'{}' requires unknown promotion '{req}'", p.id));
            }
        }
    }

    if let Some(id) = find_cycle(promotions) {
        errors.push(format!("prerequisite cycle through '{id}'"));
    }

    errors
}

/// Return a promotion id on a prerequisite cycle, if any.
fn find_cycle(promotions: &[PromotionData]) -> Option<String> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let by_id: HashMap<&str, &PromotionData> =
        promotions.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut marks: HashMap<&str, Mark> = by_id.keys().map(|&k| (k, Mark::Unvisited)).collect();

    fn visit<'a>(
        id: &'a str,
        by_id: &HashMap<&'a str, &'a PromotionData>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> Option<String> {
        match marks.get(id).copied() {
            Some(Mark::Done) | None => return None,
            Some(Mark::InProgress) => return Some(id.to_string()),
            Some(Mark::Unvisited) => {}
        }
        marks.insert(id, Mark::InProgress);
        if let Some(p) = by_id.get(id) {
            for req in p.prerequisite_ids() {
                if let Some(found) = visit(req, by_id, marks) {
                    return Some(found);
                }
            }
        }
        marks.insert(id, Mark::Done);
        None
    }

    for p in promotions {
        if let Some(found) = visit(p.id.as_str(), &by_id, &mut marks) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonus::Bonus;

    fn promo(id: &str, prerequisites: &[&[&str]]) -> PromotionData {
        PromotionData {
            id: id.to_string(),
            name: id.to_string(),
            abbreviation: id.to_string(),
            bonuses: [(Bonus::Strength, 10)].into_iter().collect(),
            categories: vec![Category::Melee],
            prerequisites: prerequisites
                .iter()
                .map(|g| g.iter().map(|s| (*s).to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_prerequisites_or_of_and() {
        let p = promo("c", &[&["a", "b"], &["d"]]);
        let held = |ids: &[&str]| ids.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();

        assert!(!p.prerequisites_met(&held(&[])));
        assert!(!p.prerequisites_met(&held(&["a"])));
        assert!(p.prerequisites_met(&held(&["a", "b"])));
        assert!(p.prerequisites_met(&held(&["d"])));
        assert!(promo("free", &[]).prerequisites_met(&held(&[])));
    }

    #[test]
    fn test_unknown_prerequisite_rejected() {
        let err = PromotionTable::new(1, vec![promo("a", &[&["ghost"]])]).unwrap_err();
        match err {
            GameError::InvalidData(errors) => {
                assert!(errors.iter().any(|e| e.contains("ghost")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_and_cycle_rejected() {
        let err = PromotionTable::new(
            1,
            vec![promo("a", &[&["b"]]), promo("b", &[&["a"]]), promo("b", &[])],
        )
        .unwrap_err();
        let GameError::InvalidData(errors) = err else {
            panic!("expected InvalidData");
        };
        assert!(errors.iter().any(|e| e.contains("duplicate")));
        assert!(errors.iter().any(|e| e.contains("cycle")));
    }

    #[test]
    fn test_oversized_magnitude_rejected() {
        let mut p = promo("huge", &[]);
        p.bonuses.add(Bonus::CityAttack, MAX_BONUS_MAGNITUDE + 1);
        let mut q = promo("sink", &[]);
        q.bonuses.add(Bonus::VsMelee, -MAX_BONUS_MAGNITUDE - 1);
        let GameError::InvalidData(errors) = PromotionTable::new(1, vec![p, q]).unwrap_err() else {
            panic!("expected InvalidData");
        };
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.contains("exceeds")));

        let mut edge = promo("edge", &[]);
        edge.bonuses.add(Bonus::CityAttack, MAX_BONUS_MAGNITUDE);
        assert!(PromotionTable::new(1, vec![edge]).is_ok());
    }

    #[test]
    fn test_reserved_bonus_rejected() {
        let mut p = promo("a", &[]);
        p.bonuses.add(Bonus::TerrainDefense, 10);
        assert!(PromotionTable::new(1, vec![p]).is_err());
    }

    #[test]
    fn test_parse_ron() {
        let text = r#"PromotionTable(
            version: 3,
            promotions: [
                PromotionData(
                    id: "combat1",
                    name: "Combat I",
                    abbreviation: "C1",
                    bonuses: { Strength: 10 },
                    categories: [Melee],
                ),
                PromotionData(
                    id: "combat2",
                    name: "Combat II",
                    abbreviation: "C2",
                    bonuses: { Strength: 10 },
                    categories: [Melee],
                    prerequisites: [["combat1"]],
                ),
            ],
        )"#;
        let table = PromotionTable::from_ron_str("test", text).unwrap();
        assert_eq!(table.version(), 3);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("combat2").unwrap().prerequisites, vec![vec!["combat1".to_string()]]);
    }

    #[test]
    fn test_malformed_ron() {
        let err = PromotionTable::from_ron_str("broken.ron", "PromotionTable(").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { .. }));
    }

    #[test]
    fn test_embedded_table_loads() {
        let table = PromotionTable::embedded().expect("embedded promotions are valid");
        assert!(table.contains("combat1"));
        assert!(table.contains("drill4"));
        assert!(table.contains("city_raider3"));
    }
}
