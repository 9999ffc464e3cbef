//! Loading scenarios and data tables from disk.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use warband_core::components::OwnerId;
use warband_core::error::GameError;
use warband_headless::{
    run_duels, DataTables, DuelConfig, Matchup, Scenario, ScenarioError, ScenarioRunner,
};

const SHIPPED_SCENARIO: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../assets/scenarios/border_raid.ron"
);
const SHIPPED_DATA: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets/data");

fn copy_shipped_data(dir: &Path) {
    for file in [DataTables::PROMOTIONS_FILE, DataTables::UNITS_FILE] {
        fs::copy(Path::new(SHIPPED_DATA).join(file), dir.join(file)).unwrap();
    }
}

#[test]
fn test_shipped_scenario_matches_builtin() {
    let from_file = Scenario::load(SHIPPED_SCENARIO).unwrap();
    let builtin = Scenario::border_raid();
    assert_eq!(from_file.name, builtin.name);
    assert_eq!(from_file.units.len(), builtin.units.len());

    let a = from_file.build_game(None).unwrap();
    let b = builtin.build_game(None).unwrap();
    assert_eq!(a.units().len(), b.units().len());
    assert_eq!(
        a.units().units_of(OwnerId::BARBARIAN).len(),
        b.units().units_of(OwnerId::BARBARIAN).len()
    );
}

#[test]
fn test_load_scenario_from_temp_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ambush.ron");
    fs::write(
        &path,
        r#"Scenario(
            name: "Ambush",
            map_size: (6, 6),
            units: [
                (unit_type: "warrior", owner: Player(0), position: (2, 2)),
                (unit_type: "axeman", owner: Barbarian, position: (3, 3)),
            ],
            seed: 4,
        )"#,
    )
    .unwrap();

    let scenario = Scenario::load(&path).unwrap();
    assert_eq!(scenario.seed, 4);

    let mut runner = ScenarioRunner::new(&scenario, None).unwrap();
    let mut out = Vec::new();
    let summary = runner.run(3, &mut out).unwrap();
    assert_eq!(summary.turns, 3);
    assert_eq!(summary.seed, 4);
    assert!(!out.is_empty());
}

#[test]
fn test_missing_scenario_file() {
    let dir = TempDir::new().unwrap();
    let err = Scenario::load(dir.path().join("nowhere.ron")).unwrap_err();
    assert!(matches!(err, ScenarioError::FileNotFound(_)));
}

#[test]
fn test_malformed_scenario_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.ron");
    fs::write(&path, "Scenario(name: ").unwrap();
    assert!(matches!(
        Scenario::load(&path),
        Err(ScenarioError::ParseError(_))
    ));
}

#[test]
fn test_load_data_dir() {
    let dir = TempDir::new().unwrap();
    copy_shipped_data(dir.path());

    let tables = DataTables::load_dir(dir.path()).unwrap();
    let embedded = DataTables::embedded().unwrap();
    assert_eq!(tables.promotions.len(), embedded.promotions.len());
    assert_eq!(tables.unit_types.len(), embedded.unit_types.len());

    let config = DuelConfig {
        count: 50,
        seed: 1,
        parallel: 2,
    };
    let from_dir = run_duels(&Matchup::new("warrior", "archer"), &tables, &config).unwrap();
    let from_embedded = run_duels(&Matchup::new("warrior", "archer"), &embedded, &config).unwrap();
    assert_eq!(from_dir.attacker_wins, from_embedded.attacker_wins);
}

#[test]
fn test_data_dir_missing_file() {
    let dir = TempDir::new().unwrap();
    fs::copy(
        Path::new(SHIPPED_DATA).join(DataTables::PROMOTIONS_FILE),
        dir.path().join(DataTables::PROMOTIONS_FILE),
    )
    .unwrap();
    assert!(matches!(
        DataTables::load_dir(dir.path()),
        Err(ScenarioError::ReadError(_))
    ));
}

#[test]
fn test_data_dir_unknown_free_promotion() {
    let dir = TempDir::new().unwrap();
    copy_shipped_data(dir.path());
    // Drop every promotion: free promotions on unit types no longer resolve
    fs::write(
        dir.path().join(DataTables::PROMOTIONS_FILE),
        "PromotionTable(version: 1, promotions: [])",
    )
    .unwrap();

    let err = DataTables::load_dir(dir.path()).unwrap_err();
    assert!(matches!(err, ScenarioError::Setup(GameError::InvalidData(_))), "{err}");
}
