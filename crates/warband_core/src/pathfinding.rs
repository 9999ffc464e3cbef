//! Grid pathfinding and the path request queue.
//!
//! [`find_path`] is an A* search over the eight king-move neighbours, using
//! the map's movement costs and a Chebyshev heuristic. Ties in the open set
//! break on coordinates, so the same query always yields the same path.
//!
//! Path requests from the game loop go through [`PathQueue`]: a request
//! returns a [`PathTicket`], a newer request for the same unit supersedes the
//! older one, and a destroyed unit's request is cancelled. The game resolves
//! the queue between unit actions, so a path result never races another
//! state change.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use crate::bonus::BonusSet;
use crate::components::{Coords, UnitKey};
use crate::map::Map;

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    coords: Coords,
    /// g + h.
    f_score: u32,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse for lowest f first.
        match other.f_score.cmp(&self.f_score) {
            // Deterministic tie-breaking: lower (row, col) first
            Ordering::Equal => other.coords.cmp(&self.coords),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find the cheapest path from `start` to `goal`.
///
/// The result excludes `start` and ends with `goal`; it is empty when the two
/// coincide. Returns `None` if the goal is off the map, impassable or cut off.
pub fn find_path<M: Map + ?Sized>(
    map: &M,
    start: Coords,
    goal: Coords,
    bonuses: &BonusSet,
) -> Option<Vec<Coords>> {
    if !map.valid_coords(start) || !map.valid_coords(goal) {
        return None;
    }
    if start == goal {
        return Some(Vec::new());
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<Coords, Coords> = HashMap::new();
    let mut g_score: HashMap<Coords, u32> = HashMap::new();

    g_score.insert(start, 0);
    open_set.push(AStarNode {
        coords: start,
        f_score: start.chebyshev(goal),
    });

    while let Some(current) = open_set.pop() {
        if current.coords == goal {
            return Some(reconstruct_path(&came_from, start, goal));
        }

        let current_g = g_score.get(&current.coords).copied().unwrap_or(u32::MAX);
        // Stale heap entry
        if current.f_score > current_g.saturating_add(current.coords.chebyshev(goal)) {
            continue;
        }

        for neighbor in current.coords.neighbors() {
            if !map.valid_coords(neighbor) {
                continue;
            }
            let Some(step_cost) = map.movement_cost(current.coords, neighbor, bonuses) else {
                continue;
            };

            let tentative_g = current_g.saturating_add(step_cost);
            if tentative_g < g_score.get(&neighbor).copied().unwrap_or(u32::MAX) {
                came_from.insert(neighbor, current.coords);
                g_score.insert(neighbor, tentative_g);
                open_set.push(AStarNode {
                    coords: neighbor,
                    f_score: tentative_g.saturating_add(neighbor.chebyshev(goal)),
                });
            }
        }
    }

    None
}

/// Walk `came_from` back from the goal.
fn reconstruct_path(came_from: &HashMap<Coords, Coords>, start: Coords, goal: Coords) -> Vec<Coords> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Handle for an outstanding path request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathTicket(pub u64);

/// What to do with a resolved path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathIntent {
    /// Take the first step only.
    Step,
    /// Keep moving along the path while movement remains.
    Travel,
}

/// An outstanding path request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRequest {
    /// Ticket returned to the requester.
    pub ticket: PathTicket,
    /// Unit the path is for.
    pub unit: UnitKey,
    /// Destination.
    pub target: Coords,
    /// How the path will be used.
    pub intent: PathIntent,
}

/// Pending path requests, at most one per unit.
#[derive(Debug, Clone, Default)]
pub struct PathQueue {
    next_ticket: u64,
    /// Requests in ticket order.
    pending: Vec<PathRequest>,
}

impl PathQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a path request, superseding any earlier one for the unit.
    pub fn request(&mut self, unit: UnitKey, target: Coords, intent: PathIntent) -> PathTicket {
        if self.cancel(unit) {
            tracing::debug!(%unit, "Superseded pending path request");
        }
        self.next_ticket += 1;
        let ticket = PathTicket(self.next_ticket);
        self.pending.push(PathRequest {
            ticket,
            unit,
            target,
            intent,
        });
        ticket
    }

    /// Drop the unit's pending request. Returns whether one existed.
    pub fn cancel(&mut self, unit: UnitKey) -> bool {
        let before = self.pending.len();
        self.pending.retain(|r| r.unit != unit);
        self.pending.len() != before
    }

    /// Whether a ticket is still outstanding.
    #[must_use]
    pub fn is_pending(&self, ticket: PathTicket) -> bool {
        self.pending.iter().any(|r| r.ticket == ticket)
    }

    /// Take every outstanding request in ticket order.
    pub fn drain(&mut self) -> Vec<PathRequest> {
        std::mem::take(&mut self.pending)
    }

    /// Number of outstanding requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
