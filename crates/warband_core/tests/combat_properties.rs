//! Property tests for the closed-form combat model.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use warband_core::combat::{damage_per_hit, modified_strength, win_odds, MAX_DAMAGE, MIN_DAMAGE};
use warband_core::prelude::*;
use warband_test_utils::determinism::strategies::{
    arb_bonus_grants, arb_bonus_set, arb_category, arb_health, arb_modified_strength,
    arb_strength, arb_strength_percent, arb_tile,
};
use warband_test_utils::fixtures::{melee_unit, promotion_table};

/// A unit holding the eligible promotions picked by `mask`, at `health` percent.
fn promoted_unit(
    table: &PromotionTable,
    key: UnitKey,
    category: Category,
    strength: u32,
    health: u32,
    mask: u64,
) -> Unit {
    let mut unit = Unit::new(key, "test", category, strength, 1, Coords::new(0, 0));
    unit.promotions = table
        .iter()
        .filter(|p| p.allows(category))
        .enumerate()
        .filter(|(i, _)| *i < 64 && (mask >> i) & 1 == 1)
        .map(|(_, p)| p.id.clone())
        .collect();
    unit.current_strength =
        Fixed::from_num(strength) * Fixed::from_num(health) / Fixed::from_num(100);
    unit
}

proptest! {
    /// Attacker and defender odds always sum to one.
    #[test]
    fn prop_odds_are_complementary(a in arb_modified_strength(), d in arb_modified_strength()) {
        let odds = win_odds(a, d);
        prop_assert!(odds > Fixed::ZERO && odds < Fixed::ONE);
        let reverse = win_odds(d, a);
        let sum = (odds + reverse).to_num::<f64>();
        prop_assert!((sum - 1.0).abs() < 1e-6);
    }

    /// Damage stays within its clamp and favours the stronger side.
    #[test]
    fn prop_damage_is_bounded(a in arb_modified_strength(), d in arb_modified_strength()) {
        let hit = damage_per_hit(a, d);
        prop_assert!((MIN_DAMAGE..=MAX_DAMAGE).contains(&hit));
        if a >= d {
            prop_assert!(hit >= damage_per_hit(d, a));
        }
    }

    /// Modified strength is positive for any percent and health.
    #[test]
    fn prop_strength_is_positive(
        strength in arb_strength(),
        pct in arb_strength_percent(),
        health in arb_health(),
    ) {
        let s = modified_strength(strength, pct, health);
        prop_assert!(s > Fixed::ZERO);
        // Never above the fully healthy figure
        prop_assert!(s <= modified_strength(strength, pct, 100));
    }

    /// Grants of the same bonus add up rather than compound.
    #[test]
    fn prop_bonuses_stack_additively(grants in arb_bonus_grants(8)) {
        let set: BonusSet = grants.iter().copied().collect();
        let total: i32 = grants.iter().map(|(_, v)| v).sum();
        prop_assert_eq!(set.strength_percent(), total);
        for (bonus, _) in &grants {
            let expected: i32 = grants.iter().filter(|(b, _)| b == bonus).map(|(_, v)| v).sum();
            prop_assert_eq!(set.get(*bonus), expected);
        }
    }

    /// Merging two sets sums every bonus present in either.
    #[test]
    fn prop_merge_sums_per_bonus(a in arb_bonus_set(6), b in arb_bonus_set(6)) {
        let mut merged = a.clone();
        merged.merge(&b);
        for (bonus, _) in a.iter().chain(b.iter()) {
            prop_assert_eq!(merged.get(bonus), a.get(bonus) + b.get(bonus));
        }
        prop_assert_eq!(merged.strength_percent(), a.strength_percent() + b.strength_percent());
    }

    /// The evaluated odds are A / (A + D) of the strengths that same call
    /// reports, strictly between zero and one, whatever the promotions,
    /// health and tile.
    #[test]
    fn prop_evaluated_odds_match_reported_strengths(
        attacker_category in arb_category(),
        defender_category in arb_category(),
        attacker_strength in arb_strength(),
        defender_strength in arb_strength(),
        attacker_health in 1u32..=100u32,
        defender_health in 1u32..=100u32,
        attacker_mask in any::<u64>(),
        defender_mask in any::<u64>(),
        tile in arb_tile(),
    ) {
        let table = promotion_table();
        let attacker = promoted_unit(
            &table,
            UnitKey::new(OwnerId(0), UnitId(1)),
            attacker_category,
            attacker_strength,
            attacker_health,
            attacker_mask,
        );
        let defender = promoted_unit(
            &table,
            UnitKey::new(OwnerId::BARBARIAN, UnitId(2)),
            defender_category,
            defender_strength,
            defender_health,
            defender_mask,
        );

        let ctx = BattleContext::new(&attacker, &defender, tile);
        let odds = CombatModel::new(&table).evaluate(&ctx);
        let a = odds.attacker_strength;
        let d = odds.defender_strength;
        prop_assert!(a > Fixed::ZERO && d > Fixed::ZERO);
        prop_assert_eq!(odds.odds_attacker_wins, win_odds(a, d));

        let (a, d) = (a.to_num::<f64>(), d.to_num::<f64>());
        let expected = a / (a + d);
        prop_assert!((odds.odds_attacker_wins.to_num::<f64>() - expected).abs() < 1e-6);
        prop_assert!(odds.odds_attacker_wins > Fixed::ZERO);
        prop_assert!(odds.odds_attacker_wins < Fixed::ONE);
    }

    /// The odds reported to the player are the ones the fight runs with.
    #[test]
    fn prop_simulation_uses_reported_odds(
        a in arb_strength(),
        d in arb_strength(),
        seed in any::<u64>(),
    ) {
        let attacker = melee_unit(OwnerId(0), 1, a);
        let defender = melee_unit(OwnerId(1), 2, d);
        let odds = CombatOdds::from_bonuses(&attacker, &defender, &BonusSet::new(), &BonusSet::new());
        let battle = BattleSimulator::new()
            .run(&odds, &mut ChaCha8Rng::seed_from_u64(seed))
            .unwrap();

        prop_assert_eq!(&battle.odds, &odds);
        prop_assert_eq!(battle.hit_points[battle.loser().index()], 0);
        for round in &battle.rounds {
            prop_assert_eq!(round.damage, odds.damage_per_hit[round.striker.index()]);
        }
    }
}
