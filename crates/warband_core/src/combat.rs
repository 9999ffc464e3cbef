//! Closed-form combat model.
//!
//! Computes modified strengths, damage per hit and the analytic win odds for
//! an engagement without touching either unit. The same figures drive the
//! live [`battle`](crate::battle) simulation, the AI's "what if" queries and
//! UI previews, so the three can never disagree.
//!
//! # Formulas
//!
//! - `S = strength × (1 + pct/100) × hp/100`, `pct` floored at -90 and `hp`
//!   (0-100 scale) floored at 1 for a living unit.
//! - `damage(i → j) = floor(20 × (3Si + Sj) / (3Sj + Si))`, clamped to `[6, 60]`.
//! - `odds = A / (A + D)`.

use serde::{Deserialize, Serialize};

use crate::bonus::{BattleContext, Bonus, BonusResolver, BonusSet, Side};
use crate::components::Unit;
use crate::data::PromotionTable;
use crate::map::TileFeatures;
use crate::math::{fixed_decimal, percent, Fixed};

/// Smallest damage a single hit can deal.
pub const MIN_DAMAGE: u32 = 6;

/// Largest damage a single hit can deal.
pub const MAX_DAMAGE: u32 = 60;

/// Floor on the combined strength percent.
pub const MIN_STRENGTH_PERCENT: i32 = -90;

/// Hit points each side starts a fight with.
pub const HIT_POINTS: u32 = 100;

/// Modified strength from base strength, combined percent and health (0-100).
#[must_use]
pub fn modified_strength(strength: u32, strength_percent: i32, health_percent: u32) -> Fixed {
    let pct = strength_percent.max(MIN_STRENGTH_PERCENT);
    let health = health_percent.clamp(1, HIT_POINTS);
    let hundred = Fixed::from_num(100);
    Fixed::saturating_from_num(strength.max(1))
        .saturating_mul(Fixed::saturating_from_num(100 + i64::from(pct)))
        / hundred
        * Fixed::from_num(health)
        / hundred
}

/// Damage a side of strength `own` deals per hit against strength `other`.
///
/// Evaluated on the raw fixed-point bits in `i128`, so no strength the
/// model can produce overflows.
#[must_use]
pub fn damage_per_hit(own: Fixed, other: Fixed) -> u32 {
    let own = i128::from(own.to_bits());
    let other = i128::from(other.to_bits());
    let numerator = 20 * (3 * own + other);
    let denominator = 3 * other + own;
    if denominator <= 0 {
        return MAX_DAMAGE;
    }
    let raw = numerator.div_euclid(denominator);
    raw.clamp(i128::from(MIN_DAMAGE), i128::from(MAX_DAMAGE)) as u32
}

/// Analytic probability that the attacker wins: `A / (A + D)`.
#[must_use]
pub fn win_odds(attacker: Fixed, defender: Fixed) -> Fixed {
    attacker.saturating_div(attacker.saturating_add(defender))
}

/// Figures for one engagement, real or hypothetical.
///
/// Pairs are indexed by [`Side::index`]: attacker first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatOdds {
    /// Modified attacker strength (A).
    #[serde(with = "fixed_decimal")]
    pub attacker_strength: Fixed,
    /// Modified defender strength (D).
    #[serde(with = "fixed_decimal")]
    pub defender_strength: Fixed,
    /// Damage each side deals per landed hit.
    pub damage_per_hit: [u32; 2],
    /// Probability the attacker wins, `A / (A + D)`.
    #[serde(with = "fixed_decimal")]
    pub odds_attacker_wins: Fixed,
    /// Guaranteed free hits before the exchange.
    pub first_strikes: [u32; 2],
    /// Free hits that each land on a coin flip.
    pub first_strike_chances: [u32; 2],
    /// Withdraw chance in percent.
    pub withdraw_percent: [i32; 2],
}

impl CombatOdds {
    /// Build the figures from resolved bonus sets.
    #[must_use]
    pub fn from_bonuses(
        attacker: &Unit,
        defender: &Unit,
        attacker_bonuses: &BonusSet,
        defender_bonuses: &BonusSet,
    ) -> Self {
        let a = modified_strength(
            attacker.strength,
            attacker_bonuses.strength_percent(),
            attacker.health_percent(),
        );
        let d = modified_strength(
            defender.strength,
            defender_bonuses.strength_percent(),
            defender.health_percent(),
        );
        Self {
            attacker_strength: a,
            defender_strength: d,
            damage_per_hit: [damage_per_hit(a, d), damage_per_hit(d, a)],
            odds_attacker_wins: win_odds(a, d),
            first_strikes: [
                attacker_bonuses.count(Bonus::FirstStrikes),
                defender_bonuses.count(Bonus::FirstStrikes),
            ],
            first_strike_chances: [
                attacker_bonuses.count(Bonus::FirstStrikeChances),
                defender_bonuses.count(Bonus::FirstStrikeChances),
            ],
            withdraw_percent: [
                attacker_bonuses.get(Bonus::Withdraw),
                defender_bonuses.get(Bonus::Withdraw),
            ],
        }
    }

    /// Probability the attacker survives, counting a withdrawal from a
    /// losing fight. For display only.
    #[must_use]
    pub fn survival_odds(&self) -> Fixed {
        let withdraw = percent(self.withdraw_percent[0].clamp(0, 100));
        self.odds_attacker_wins + (Fixed::ONE - self.odds_attacker_wins) * withdraw
    }
}

/// Evaluates engagements against a promotion table.
#[derive(Debug, Clone, Copy)]
pub struct CombatModel<'a> {
    resolver: BonusResolver<'a>,
}

impl<'a> CombatModel<'a> {
    /// Create a model over a promotion table.
    #[must_use]
    pub const fn new(table: &'a PromotionTable) -> Self {
        Self {
            resolver: BonusResolver::new(table),
        }
    }

    /// The bonus resolver used by this model.
    #[must_use]
    pub const fn resolver(&self) -> &BonusResolver<'a> {
        &self.resolver
    }

    /// Compute the engagement figures. Pure.
    #[must_use]
    pub fn evaluate(&self, ctx: &BattleContext<'_>) -> CombatOdds {
        let attacker_bonuses = self.resolver.resolve(ctx.attacker, Side::Attacker, ctx);
        let defender_bonuses = self.resolver.resolve(ctx.defender, Side::Defender, ctx);
        CombatOdds::from_bonuses(ctx.attacker, ctx.defender, &attacker_bonuses, &defender_bonuses)
    }

    /// The enemy on a tile that gives `attacker` the worst odds.
    ///
    /// Ties go to the lowest unit id. Friendly and dead units are skipped.
    pub fn best_defender<'u>(
        &self,
        attacker: &Unit,
        occupants: impl IntoIterator<Item = &'u Unit>,
        tile: &TileFeatures,
    ) -> Option<(&'u Unit, CombatOdds)> {
        let mut best: Option<(&'u Unit, CombatOdds)> = None;
        for defender in occupants {
            if !defender.is_enemy_of(attacker) || !defender.is_alive() {
                continue;
            }
            let ctx = BattleContext::new(attacker, defender, tile.clone());
            let odds = self.evaluate(&ctx);
            let better = match &best {
                None => true,
                Some((current, current_odds)) => {
                    odds.odds_attacker_wins < current_odds.odds_attacker_wins
                        || (odds.odds_attacker_wins == current_odds.odds_attacker_wins
                            && defender.key.id < current.key.id)
                }
            };
            if better {
                best = Some((defender, odds));
            }
        }
        best
    }
}
