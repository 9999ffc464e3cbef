//! Turn-by-turn scenario playback.
//!
//! Plays the AI for the scenario's AI owners and writes every game event to
//! the output as one JSON object per line, tagged with the turn number.

use std::collections::BTreeMap;
use std::io::Write;

use serde::{Deserialize, Serialize};
use warband_core::components::OwnerId;
use warband_core::game::{Game, GameEvent};

use crate::scenario::{Scenario, ScenarioError};

/// A game event tagged with the turn it happened in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnEvent {
    /// Turn number, starting at 1.
    pub turn: u32,
    /// The event.
    pub event: GameEvent,
}

/// Final state of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Scenario name.
    pub scenario: String,
    /// Seed the game ran with.
    pub seed: u64,
    /// Turns played.
    pub turns: u32,
    /// Fights resolved.
    pub battles: u32,
    /// Fights won by the attacker.
    pub attacker_victories: u32,
    /// Units destroyed.
    pub units_destroyed: u32,
    /// Surviving units per owner.
    pub units_remaining: BTreeMap<String, usize>,
}

/// Plays a scenario without a renderer.
pub struct ScenarioRunner {
    game: Game,
    ai_owners: Vec<OwnerId>,
    summary: RunSummary,
}

impl ScenarioRunner {
    /// Build the scenario's game.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] if the scenario cannot be set up.
    pub fn new(scenario: &Scenario, seed: Option<u64>) -> Result<Self, ScenarioError> {
        let seed = seed.unwrap_or(scenario.seed);
        let game = scenario.build_game(Some(seed))?;
        Ok(Self::with_game(game, scenario.ai_owners(), &scenario.name, seed))
    }

    /// Wrap an already prepared game.
    #[must_use]
    pub fn with_game(game: Game, ai_owners: Vec<OwnerId>, name: &str, seed: u64) -> Self {
        Self {
            game,
            ai_owners,
            summary: RunSummary {
                scenario: name.to_string(),
                seed,
                ..RunSummary::default()
            },
        }
    }

    /// The game being played.
    #[must_use]
    pub const fn game(&self) -> &Game {
        &self.game
    }

    /// Play one turn: each AI owner acts in order, then the turn ends.
    pub fn play_turn(&mut self) -> Vec<TurnEvent> {
        let turn = self.game.turn() + 1;
        for &owner in &self.ai_owners {
            let decisions = self.game.run_ai_turn(owner);
            tracing::debug!(turn, %owner, units = decisions.len(), "AI turn finished");
        }
        self.game.end_turn();

        let events: Vec<TurnEvent> = self
            .game
            .drain_events()
            .into_iter()
            .map(|event| TurnEvent { turn, event })
            .collect();
        for e in &events {
            match &e.event {
                GameEvent::Battle(report) => {
                    self.summary.battles += 1;
                    if report.winner() == report.attacker {
                        self.summary.attacker_victories += 1;
                    }
                }
                GameEvent::UnitDestroyed { .. } => self.summary.units_destroyed += 1,
                _ => {}
            }
        }
        self.summary.turns += 1;
        events
    }

    /// Play `turns` turns, writing each event as a JSON line.
    ///
    /// # Errors
    ///
    /// Fails if writing to `out` fails.
    pub fn run<W: Write>(&mut self, turns: u32, out: &mut W) -> std::io::Result<RunSummary> {
        for _ in 0..turns {
            for event in self.play_turn() {
                let line = serde_json::to_string(&event).map_err(std::io::Error::other)?;
                writeln!(out, "{line}")?;
            }
        }
        Ok(self.summary())
    }

    /// Summary of the run so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let mut summary = self.summary.clone();
        summary.units_remaining = self
            .game
            .units()
            .owners()
            .into_iter()
            .map(|owner| (owner.to_string(), self.game.units().units_of(owner).len()))
            .collect();
        summary
    }
}
