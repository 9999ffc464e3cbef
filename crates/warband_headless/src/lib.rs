//! Headless runner for odds queries, duel batches and scenario playback.
//!
//! This crate drives `warband_core` without a renderer:
//!
//! - **Odds queries**: closed-form figures for any matchup of unit types
//! - **Duel batches**: thousands of simulated fights in parallel, compared
//!   against the analytic odds
//! - **Scenario playback**: the AI plays a RON scenario turn by turn
//!
//! # Output
//!
//! - **stdout**: JSON (one object per line for event streams)
//! - **stderr**: logs (human-readable, filtered with `RUST_LOG`)
//!
//! # Example
//!
//! ```bash
//! cargo run -p warband_headless -- odds --attacker axeman --defender archer --feature hills
//! cargo run -p warband_headless -- duel --attacker warrior --defender warrior --count 5000
//! cargo run -p warband_headless -- run --scenario assets/scenarios/border_raid.ron --turns 20
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod runner;
pub mod scenario;

pub use batch::{run_duels, DuelConfig, DuelSummary, Matchup};
pub use runner::{RunSummary, ScenarioRunner, TurnEvent};
pub use scenario::{DataTables, Scenario, ScenarioError};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `debug` with `verbose`
/// and `info` without.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Ignore the error when a subscriber is already installed (tests)
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .try_init();
}
