//! Statistical checks of the battle simulator against the closed-form odds.

use warband_core::prelude::*;
use warband_test_utils::balance::{odds_with, plain_odds, run_duels};
use warband_test_utils::fixtures::{melee_unit, promotion_table};

const FIGHTS: u32 = 4000;

#[test]
fn test_equal_units_converge_to_even_odds() {
    let odds = plain_odds(4, 4);
    assert_eq!(odds.odds_attacker_wins, Fixed::from_num(0.5));

    let stats = run_duels(&odds, FIGHTS, 1);
    assert!(
        stats.converges_to(0.5, 0.03),
        "attacker won {:.3} of {} fights",
        stats.attacker_win_rate(),
        stats.total
    );
}

#[test]
fn test_equal_promoted_units_converge_to_even_odds() {
    let table = promotion_table();
    let model = CombatModel::new(&table);
    let mut attacker = melee_unit(OwnerId(0), 1, 6);
    let mut defender = melee_unit(OwnerId::BARBARIAN, 2, 6);
    attacker.promotions = vec!["combat1".into(), "combat2".into()];
    defender.promotions = vec!["combat1".into(), "combat2".into()];

    let odds = model.evaluate(&BattleContext::new(&attacker, &defender, TileFeatures::open()));
    assert_eq!(odds.odds_attacker_wins, Fixed::from_num(0.5));
    assert!(run_duels(&odds, FIGHTS, 2).converges_to(0.5, 0.03));
}

#[test]
fn test_favourite_wins_at_least_its_round_odds() {
    // Larger hits compound the per-round edge, so the favourite's fight
    // win rate sits above its round odds.
    for (a, d) in [(5, 4), (6, 4), (8, 2)] {
        let odds = plain_odds(a, d);
        let expected = odds.odds_attacker_wins.to_num::<f64>();
        let stats = run_duels(&odds, 2000, 3);
        assert!(
            stats.attacker_win_rate() + 0.03 >= expected,
            "{a} vs {d}: won {:.3}, round odds {expected:.3}",
            stats.attacker_win_rate()
        );
    }
}

#[test]
fn test_underdog_win_rate_is_monotonic() {
    let weak = run_duels(&plain_odds(2, 6), 2000, 4).attacker_win_rate();
    let fair = run_duels(&plain_odds(4, 6), 2000, 4).attacker_win_rate();
    let strong = run_duels(&plain_odds(6, 6), 2000, 4).attacker_win_rate();
    assert!(weak < fair && fair < strong);
}

#[test]
fn test_first_strikes_shift_outcomes() {
    let attacker = melee_unit(OwnerId(0), 1, 4);
    let defender = melee_unit(OwnerId(1), 2, 4);
    let drilled: BonusSet = [(Bonus::FirstStrikes, 2)].into_iter().collect();

    let odds = odds_with(&attacker, &defender, &drilled, &BonusSet::new());
    // First strikes never change the closed-form odds
    assert_eq!(odds.odds_attacker_wins, Fixed::from_num(0.5));
    assert_eq!(odds.first_strikes, [2, 0]);

    let stats = run_duels(&odds, 2000, 5);
    assert!(stats.attacker_win_rate() > 0.6);
}

#[test]
fn test_winner_always_survives_with_hit_points() {
    let stats = run_duels(&plain_odds(3, 5), 500, 6);
    assert_eq!(stats.attacker_wins + stats.defender_wins, 500);
    assert!(stats.mean_winner_hp() > 0.0);
    assert!(stats.mean_rounds() >= 2.0);
}
