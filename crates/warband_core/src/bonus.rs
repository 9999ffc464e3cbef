//! Combat bonuses and their resolution for a given battle.
//!
//! Promotions grant bonuses from a closed vocabulary ([`Bonus`]). For a
//! fight, [`BonusResolver`] flattens a unit's promotions into a [`BonusSet`]
//! holding only the bonuses that apply in that role on that tile.
//!
//! # Stacking
//!
//! Bonuses of the same name add up. Two promotions granting `+10` strength
//! yield `+20`, never a compounded `+21`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{Category, Unit};
use crate::data::PromotionTable;
use crate::map::{Feature, TileFeatures};

/// Named combat or movement modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bonus {
    /// Strength percent in every fight.
    Strength,
    /// Strength percent when attacking.
    AttackStrength,
    /// Strength percent when defending.
    DefenseStrength,
    /// Strength percent when attacking a city tile.
    CityAttack,
    /// Strength percent when defending a city tile.
    CityDefense,
    /// Strength percent when attacking onto hills.
    HillsAttack,
    /// Strength percent when defending on hills.
    HillsDefense,
    /// Strength percent when attacking into forest.
    ForestAttack,
    /// Strength percent when defending in forest.
    ForestDefense,
    /// Strength percent when attacking into jungle.
    JungleAttack,
    /// Strength percent when defending in jungle.
    JungleDefense,
    /// Strength percent against melee units.
    VsMelee,
    /// Strength percent against archery units.
    VsArchery,
    /// Strength percent against mounted units.
    VsMounted,
    /// Strength percent against siege units.
    VsSiege,
    /// Intrinsic defense of the defender's tile. Never granted by promotions.
    TerrainDefense,
    /// Guaranteed free hits before the exchange.
    FirstStrikes,
    /// Free hits that each land with a coin flip.
    FirstStrikeChances,
    /// Percent chance to withdraw from a losing attack.
    Withdraw,
    /// Extra healing percent per turn.
    Heal,
    /// Extra movement points.
    Movement,
    /// Forest and jungle cost a single movement point.
    ForestDoubleMove,
    /// Hills cost a single movement point.
    HillsDoubleMove,
}

/// How a bonus magnitude is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusKind {
    /// Adds to the combined strength percentage.
    StrengthPercent,
    /// A count (free hits, movement points).
    Count,
    /// A non-strength percentage or flag.
    Utility,
}

impl Bonus {
    /// How the magnitude of this bonus is used.
    #[must_use]
    pub const fn kind(self) -> BonusKind {
        match self {
            Self::Strength
            | Self::AttackStrength
            | Self::DefenseStrength
            | Self::CityAttack
            | Self::CityDefense
            | Self::HillsAttack
            | Self::HillsDefense
            | Self::ForestAttack
            | Self::ForestDefense
            | Self::JungleAttack
            | Self::JungleDefense
            | Self::VsMelee
            | Self::VsArchery
            | Self::VsMounted
            | Self::VsSiege
            | Self::TerrainDefense => BonusKind::StrengthPercent,
            Self::FirstStrikes | Self::FirstStrikeChances | Self::Movement => BonusKind::Count,
            Self::Withdraw | Self::Heal | Self::ForestDoubleMove | Self::HillsDoubleMove => {
                BonusKind::Utility
            }
        }
    }

    /// Whether promotions may grant this bonus.
    #[must_use]
    pub const fn is_grantable(self) -> bool {
        !matches!(self, Self::TerrainDefense)
    }

    /// Whether this bonus holds in the given role and battle.
    #[must_use]
    pub fn applies(self, role: Side, opponent: Category, tile: &TileFeatures, initiating: bool) -> bool {
        let attacking = role == Side::Attacker;
        let defending = role == Side::Defender;
        match self {
            Self::AttackStrength => attacking,
            Self::DefenseStrength => defending,
            Self::CityAttack => attacking && initiating && tile.city,
            Self::CityDefense => defending && tile.city,
            Self::HillsAttack => attacking && tile.has(Feature::Hills),
            Self::HillsDefense => defending && tile.has(Feature::Hills),
            Self::ForestAttack => attacking && tile.has(Feature::Forest),
            Self::ForestDefense => defending && tile.has(Feature::Forest),
            Self::JungleAttack => attacking && tile.has(Feature::Jungle),
            Self::JungleDefense => defending && tile.has(Feature::Jungle),
            Self::VsMelee => opponent == Category::Melee,
            Self::VsArchery => opponent == Category::Archery,
            Self::VsMounted => opponent == Category::Mounted,
            Self::VsSiege => opponent == Category::Siege,
            Self::TerrainDefense => defending,
            Self::Withdraw => attacking,
            Self::Strength
            | Self::FirstStrikes
            | Self::FirstStrikeChances
            | Self::Heal
            | Self::Movement
            | Self::ForestDoubleMove
            | Self::HillsDoubleMove => true,
        }
    }
}

/// Side of an engagement a unit fights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The side that initiated the attack.
    Attacker,
    /// The side holding the tile.
    Defender,
}

impl Side {
    /// Index into `[attacker, defender]` pairs.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Attacker => 0,
            Self::Defender => 1,
        }
    }

    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Attacker => Self::Defender,
            Self::Defender => Self::Attacker,
        }
    }
}

/// Flat mapping from bonus to summed magnitude.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BonusSet {
    values: BTreeMap<Bonus, i32>,
}

impl BonusSet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a magnitude to a bonus.
    pub fn add(&mut self, bonus: Bonus, value: i32) {
        let total = self.values.entry(bonus).or_insert(0);
        *total = total.saturating_add(value);
    }

    /// Merge another set additively.
    pub fn merge(&mut self, other: &BonusSet) {
        for (&bonus, &value) in &other.values {
            self.add(bonus, value);
        }
    }

    /// Summed magnitude of a bonus (0 if absent).
    #[must_use]
    pub fn get(&self, bonus: Bonus) -> i32 {
        self.values.get(&bonus).copied().unwrap_or(0)
    }

    /// Whether a bonus is present with a positive magnitude.
    #[must_use]
    pub fn has(&self, bonus: Bonus) -> bool {
        self.get(bonus) > 0
    }

    /// Sum of every strength-percent bonus in the set.
    #[must_use]
    pub fn strength_percent(&self) -> i32 {
        self.values
            .iter()
            .filter(|(b, _)| b.kind() == BonusKind::StrengthPercent)
            .fold(0i32, |sum, (_, v)| sum.saturating_add(*v))
    }

    /// Non-negative count for a count-kind bonus.
    #[must_use]
    pub fn count(&self, bonus: Bonus) -> u32 {
        u32::try_from(self.get(bonus)).unwrap_or(0)
    }

    /// Iterate over `(bonus, magnitude)` pairs in vocabulary order.
    pub fn iter(&self) -> impl Iterator<Item = (Bonus, i32)> + '_ {
        self.values.iter().map(|(&b, &v)| (b, v))
    }

    /// Whether no bonus is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keep only bonuses matching a predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(Bonus) -> bool) {
        self.values.retain(|&b, _| keep(b));
    }
}

impl FromIterator<(Bonus, i32)> for BonusSet {
    fn from_iter<T: IntoIterator<Item = (Bonus, i32)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (bonus, value) in iter {
            set.add(bonus, value);
        }
        set
    }
}

/// Inputs to one odds computation or fight.
#[derive(Debug, Clone)]
pub struct BattleContext<'a> {
    /// The attacking unit.
    pub attacker: &'a Unit,
    /// The defending unit.
    pub defender: &'a Unit,
    /// The defender's tile.
    pub tile: TileFeatures,
    /// Whether the attacker initiated the engagement.
    pub initiating: bool,
}

impl<'a> BattleContext<'a> {
    /// Context for an attack initiated by `attacker` onto `defender`'s tile.
    #[must_use]
    pub fn new(attacker: &'a Unit, defender: &'a Unit, tile: TileFeatures) -> Self {
        Self {
            attacker,
            defender,
            tile,
            initiating: true,
        }
    }

    /// The unit fighting in `role`.
    #[must_use]
    pub fn unit(&self, role: Side) -> &'a Unit {
        match role {
            Side::Attacker => self.attacker,
            Side::Defender => self.defender,
        }
    }

    /// The unit opposing `role`.
    #[must_use]
    pub fn opponent(&self, role: Side) -> &'a Unit {
        match role {
            Side::Attacker => self.defender,
            Side::Defender => self.attacker,
        }
    }
}

/// Flattens promotions into the bonuses that apply to one side of a battle.
#[derive(Debug, Clone, Copy)]
pub struct BonusResolver<'a> {
    table: &'a PromotionTable,
}

impl<'a> BonusResolver<'a> {
    /// Create a resolver over a promotion table.
    #[must_use]
    pub const fn new(table: &'a PromotionTable) -> Self {
        Self { table }
    }

    /// Every bonus the unit's eligible promotions grant, before context
    /// filtering. Used for movement and healing.
    #[must_use]
    pub fn innate(&self, unit: &Unit) -> BonusSet {
        let mut set = BonusSet::new();
        for id in &unit.promotions {
            let Some(promotion) = self.table.get(id) else {
                tracing::warn!(unit = %unit.key, promotion = %id, "Unit holds unknown promotion");
                continue;
            };
            if promotion.allows(unit.category) {
                set.merge(&promotion.bonuses);
            }
        }
        set
    }

    /// Bonuses applying to `unit` fighting in `role` within `ctx`.
    ///
    /// The defender also receives the intrinsic defense of its tile.
    #[must_use]
    pub fn resolve(&self, unit: &Unit, role: Side, ctx: &BattleContext<'_>) -> BonusSet {
        let opponent = ctx.opponent(role).category;
        let mut set = self.innate(unit);
        set.retain(|b| b.applies(role, opponent, &ctx.tile, ctx.initiating));

        if role == Side::Defender {
            let terrain = ctx.tile.defense_percent();
            if terrain != 0 {
                set.add(Bonus::TerrainDefense, terrain);
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Coords, OwnerId, UnitId, UnitKey};
    use crate::data::PromotionData;

    fn unit(owner: u32, id: u64, category: Category, promotions: &[&str]) -> Unit {
        let mut u = Unit::new(
            UnitKey::new(OwnerId(owner), UnitId(id)),
            "test",
            category,
            4,
            1,
            Coords::new(0, 0),
        );
        u.promotions = promotions.iter().map(|p| (*p).to_string()).collect();
        u
    }

    fn promo(id: &str, bonuses: &[(Bonus, i32)], categories: &[Category]) -> PromotionData {
        PromotionData {
            id: id.to_string(),
            name: id.to_string(),
            abbreviation: id.to_string(),
            bonuses: bonuses.iter().copied().collect(),
            categories: categories.to_vec(),
            prerequisites: Vec::new(),
        }
    }

    fn table() -> PromotionTable {
        PromotionTable::new(
            1,
            vec![
                promo("a", &[(Bonus::Strength, 10)], &[Category::Melee]),
                promo("b", &[(Bonus::Strength, 10)], &[Category::Melee]),
                promo("raider", &[(Bonus::CityAttack, 20)], &[Category::Melee]),
                promo("garrison", &[(Bonus::CityDefense, 20)], &[Category::Melee]),
                promo("guerilla", &[(Bonus::HillsDefense, 20)], &[Category::Melee]),
                promo("shock", &[(Bonus::VsMelee, 25)], &[Category::Melee]),
                promo("archer_only", &[(Bonus::Strength, 50)], &[Category::Archery]),
                promo("drill", &[(Bonus::FirstStrikes, 1)], &[Category::Melee]),
            ],
        )
        .expect("valid table")
    }

    #[test]
    fn test_same_bonus_stacks_additively() {
        let table = table();
        let resolver = BonusResolver::new(&table);
        let attacker = unit(0, 1, Category::Melee, &["a", "b"]);
        let defender = unit(1, 2, Category::Archery, &[]);
        let ctx = BattleContext::new(&attacker, &defender, TileFeatures::open());

        let set = resolver.resolve(&attacker, Side::Attacker, &ctx);
        assert_eq!(set.get(Bonus::Strength), 20);
        assert_eq!(set.strength_percent(), 20);
    }

    #[test]
    fn test_ineligible_category_is_ignored() {
        let table = table();
        let resolver = BonusResolver::new(&table);
        let attacker = unit(0, 1, Category::Melee, &["archer_only"]);
        assert!(resolver.innate(&attacker).is_empty());
    }

    #[test]
    fn test_city_bonuses_are_directional() {
        let table = table();
        let resolver = BonusResolver::new(&table);
        let attacker = unit(0, 1, Category::Melee, &["raider", "garrison"]);
        let defender = unit(1, 2, Category::Melee, &["raider", "garrison"]);
        let city = TileFeatures {
            city: true,
            ..TileFeatures::open()
        };
        let ctx = BattleContext::new(&attacker, &defender, city);

        let att = resolver.resolve(&attacker, Side::Attacker, &ctx);
        assert_eq!(att.get(Bonus::CityAttack), 20);
        assert_eq!(att.get(Bonus::CityDefense), 0);

        let def = resolver.resolve(&defender, Side::Defender, &ctx);
        assert_eq!(def.get(Bonus::CityAttack), 0);
        assert_eq!(def.get(Bonus::CityDefense), 20);

        // No city on the tile: neither applies
        let open = BattleContext::new(&attacker, &defender, TileFeatures::open());
        assert_eq!(resolver.resolve(&attacker, Side::Attacker, &open).strength_percent(), 0);
        assert_eq!(resolver.resolve(&defender, Side::Defender, &open).strength_percent(), 0);
    }

    #[test]
    fn test_terrain_bonus_needs_feature_and_defender_role() {
        let table = table();
        let resolver = BonusResolver::new(&table);
        let attacker = unit(0, 1, Category::Melee, &["guerilla"]);
        let defender = unit(1, 2, Category::Melee, &["guerilla"]);
        let hills = TileFeatures {
            features: vec![Feature::Hills],
            ..TileFeatures::open()
        };
        let ctx = BattleContext::new(&attacker, &defender, hills);

        let def = resolver.resolve(&defender, Side::Defender, &ctx);
        assert_eq!(def.get(Bonus::HillsDefense), 20);
        assert_eq!(def.get(Bonus::TerrainDefense), 25);
        assert_eq!(def.strength_percent(), 45);

        let att = resolver.resolve(&attacker, Side::Attacker, &ctx);
        assert_eq!(att.get(Bonus::HillsDefense), 0);
    }

    #[test]
    fn test_versus_category() {
        let table = table();
        let resolver = BonusResolver::new(&table);
        let attacker = unit(0, 1, Category::Melee, &["shock"]);
        let melee = unit(1, 2, Category::Melee, &[]);
        let archer = unit(1, 3, Category::Archery, &[]);

        let vs_melee = BattleContext::new(&attacker, &melee, TileFeatures::open());
        assert_eq!(resolver.resolve(&attacker, Side::Attacker, &vs_melee).get(Bonus::VsMelee), 25);

        let vs_archer = BattleContext::new(&attacker, &archer, TileFeatures::open());
        assert_eq!(resolver.resolve(&attacker, Side::Attacker, &vs_archer).get(Bonus::VsMelee), 0);
    }

    #[test]
    fn test_count_bonuses_excluded_from_strength() {
        let table = table();
        let resolver = BonusResolver::new(&table);
        let attacker = unit(0, 1, Category::Melee, &["drill"]);
        let defender = unit(1, 2, Category::Melee, &[]);
        let ctx = BattleContext::new(&attacker, &defender, TileFeatures::open());

        let set = resolver.resolve(&attacker, Side::Attacker, &ctx);
        assert_eq!(set.count(Bonus::FirstStrikes), 1);
        assert_eq!(set.strength_percent(), 0);
    }

    #[test]
    fn test_bonus_set_merge() {
        let mut a: BonusSet = [(Bonus::Heal, 10), (Bonus::Strength, 5)].into_iter().collect();
        let b: BonusSet = [(Bonus::Heal, 15)].into_iter().collect();
        a.merge(&b);
        assert_eq!(a.get(Bonus::Heal), 25);
        assert_eq!(a.get(Bonus::Strength), 5);
        assert_eq!(a.get(Bonus::Movement), 0);
    }
}
