//! Headless warband runner.
//!
//! Runs odds queries, duel batches and AI scenario playback without
//! graphics. Results go to stdout as JSON; logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Closed-form odds for a matchup
//! cargo run -p warband_headless -- odds --attacker swordsman --defender archer --city
//!
//! # Simulate 5000 fights and compare with the odds
//! cargo run -p warband_headless -- duel --attacker warrior --defender warrior --count 5000
//!
//! # Let the barbarians play a scenario for 20 turns
//! cargo run -p warband_headless -- run --scenario assets/scenarios/border_raid.ron --turns 20
//! ```

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use warband_core::map::Feature;

use warband_headless::{
    init_logging, run_duels, DataTables, DuelConfig, Matchup, Scenario, ScenarioRunner,
};

#[derive(Parser)]
#[command(name = "warband_headless")]
#[command(about = "Headless combat and AI runner")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the closed-form odds of a matchup
    Odds {
        #[command(flatten)]
        matchup: MatchupArgs,
    },

    /// Simulate many fights of a matchup in parallel
    Duel {
        #[command(flatten)]
        matchup: MatchupArgs,

        /// Number of fights
        #[arg(short, long, default_value = "1000")]
        count: u32,

        /// Seed of the first fight
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Maximum worker threads (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: usize,
    },

    /// Play a scenario with the AI
    Run {
        /// Scenario file to load (built-in border raid when omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of turns to play
        #[arg(short, long, default_value = "10")]
        turns: u32,

        /// Override the scenario seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Args)]
struct MatchupArgs {
    /// Attacking unit type
    #[arg(long)]
    attacker: String,

    /// Defending unit type
    #[arg(long)]
    defender: String,

    /// Extra attacker promotions, comma separated
    #[arg(long, value_delimiter = ',')]
    attacker_promotions: Vec<String>,

    /// Extra defender promotions, comma separated
    #[arg(long, value_delimiter = ',')]
    defender_promotions: Vec<String>,

    /// Feature on the defender's tile (repeatable)
    #[arg(long, value_enum)]
    feature: Vec<FeatureArg>,

    /// The defender stands in a city
    #[arg(long)]
    city: bool,

    /// Directory holding promotions.ron and units.ron (embedded data when omitted)
    #[arg(long)]
    data: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FeatureArg {
    Forest,
    Jungle,
    Hills,
}

impl From<FeatureArg> for Feature {
    fn from(arg: FeatureArg) -> Self {
        match arg {
            FeatureArg::Forest => Feature::Forest,
            FeatureArg::Jungle => Feature::Jungle,
            FeatureArg::Hills => Feature::Hills,
        }
    }
}

impl MatchupArgs {
    fn matchup(&self) -> Matchup {
        Matchup {
            attacker: self.attacker.clone(),
            defender: self.defender.clone(),
            attacker_promotions: self.attacker_promotions.clone(),
            defender_promotions: self.defender_promotions.clone(),
            features: self.feature.iter().map(|&f| f.into()).collect(),
            city: self.city,
        }
    }

    fn tables(&self) -> DataTables {
        match DataTables::load_or_embedded(self.data.as_deref()) {
            Ok(tables) => tables,
            Err(e) => fail("Failed to load data", &e),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Odds { matchup } => cmd_odds(&matchup),
        Commands::Duel {
            matchup,
            count,
            seed,
            parallel,
        } => cmd_duel(
            &matchup,
            &DuelConfig {
                count,
                seed,
                parallel,
            },
        ),
        Commands::Run {
            scenario,
            turns,
            seed,
        } => cmd_run(scenario, turns, seed),
    }
}

fn fail(context: &str, error: &dyn std::fmt::Display) -> ! {
    tracing::error!(%error, "{context}");
    eprintln!("FATAL: {context}: {error}");
    std::process::exit(1);
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => fail("Failed to serialize output", &e),
    }
}

/// Print the odds of one matchup
fn cmd_odds(args: &MatchupArgs) {
    let tables = args.tables();
    match args.matchup().odds(&tables) {
        Ok(odds) => print_json(&odds),
        Err(e) => fail("Invalid matchup", &e),
    }
}

/// Run a duel batch
fn cmd_duel(args: &MatchupArgs, config: &DuelConfig) {
    let tables = args.tables();
    let summary = match run_duels(&args.matchup(), &tables, config) {
        Ok(summary) => summary,
        Err(e) => fail("Invalid matchup", &e),
    };
    print_json(&summary);

    eprintln!(
        "Attacker won {:.1}% of {} fights (odds {:.1}%, deviation {:+.1} points)",
        summary.attacker_win_rate * 100.0,
        summary.fights,
        summary.analytic_odds * 100.0,
        summary.deviation * 100.0
    );
    if summary.failed > 0 {
        eprintln!("WARNING: {} fights broke the round bound", summary.failed);
    }
}

/// Play a scenario and stream events
fn cmd_run(scenario: Option<PathBuf>, turns: u32, seed: Option<u64>) {
    let scenario = match scenario {
        Some(path) => match Scenario::load(&path) {
            Ok(s) => s,
            Err(e) => fail("Failed to load scenario", &e),
        },
        None => Scenario::border_raid(),
    };
    let mut runner = match ScenarioRunner::new(&scenario, seed) {
        Ok(runner) => runner,
        Err(e) => fail("Failed to set up scenario", &e),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = match runner.run(turns, &mut out) {
        Ok(summary) => summary,
        Err(e) => fail("Failed to write events", &e),
    };
    match serde_json::to_string(&summary) {
        Ok(json) => {
            if let Err(e) = writeln!(out, "{json}") {
                fail("Failed to write summary", &e);
            }
        }
        Err(e) => fail("Failed to serialize summary", &e),
    }
    tracing::info!(
        turns = summary.turns,
        battles = summary.battles,
        destroyed = summary.units_destroyed,
        "Scenario finished"
    );
}
