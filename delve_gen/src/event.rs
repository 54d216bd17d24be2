// Generation events — the internal step queue and observer-visible
// narrative events.
//
// The generator is a discrete, step-driven process: each committed
// placement schedules the next wakeup `step_delay_ticks` later, and the
// queue's `(tick, sequence)` key gives a total order over wakeups. These
// scheduled steps are the suspension points of the cooperative loop — the
// places where pacing delays elapse and cancellation is honored.
//
// This file defines two related but distinct concepts:
// - `ScheduledStep`: internal queue entries that drive the generator.
// - `GenEvent`: observer-visible narrative events emitted as output, the
//   fire-and-forget notification stream consumed by UI/logging/nav-bake
//   collaborators.
//
// See also: `generator.rs` for the loop that drains the queue,
// `command.rs` for the external inputs applied between steps.
//
// **Critical constraint: determinism.** Step ordering must be identical
// across replays. The `(tick, sequence)` key provides a total order.

use crate::types::{DungeonState, PathKind, TileId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

// ---------------------------------------------------------------------------
// Internal scheduled steps (priority queue)
// ---------------------------------------------------------------------------

/// A generator wakeup scheduled for a future tick.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ScheduledStep {
    /// The tick at which this step should run.
    pub tick: u64,
    /// Unique ordering key for deterministic tiebreaking within a tick.
    /// Lower values run first.
    pub sequence: u64,
}

// We want a min-heap: lowest (tick, sequence) fires first.
// Rust's BinaryHeap is a max-heap, so we reverse the ordering.
impl PartialEq for ScheduledStep {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick && self.sequence == other.sequence
    }
}

impl Eq for ScheduledStep {}

impl PartialOrd for ScheduledStep {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledStep {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse: smallest (tick, sequence) should be "greatest" for the max-heap.
        other
            .tick
            .cmp(&self.tick)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Priority queue of scheduled steps. Wraps a `BinaryHeap` with reversed
/// ordering to give us a min-heap (earliest tick fires first).
#[derive(Clone, Debug, Default)]
pub struct StepQueue {
    heap: BinaryHeap<ScheduledStep>,
    /// Monotonic counter for deterministic ordering within a tick.
    next_sequence: u64,
}

impl StepQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a step at the given tick.
    pub fn schedule(&mut self, tick: u64) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(ScheduledStep { tick, sequence });
    }

    /// Peek at the next step's tick without removing it.
    pub fn peek_tick(&self) -> Option<u64> {
        self.heap.peek().map(|e| e.tick)
    }

    /// Pop the next step if its tick is <= `up_to_tick`.
    pub fn pop_if_ready(&mut self, up_to_tick: u64) -> Option<ScheduledStep> {
        if self.heap.peek().is_some_and(|e| e.tick <= up_to_tick) {
            self.heap.pop()
        } else {
            None
        }
    }

    /// Drop all pending steps. Used on cancellation and restart.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Observer-visible narrative events (output)
// ---------------------------------------------------------------------------

/// A narrative event emitted by the generator for observers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenEvent {
    pub tick: u64,
    pub kind: GenEventKind,
}

/// Types of narrative events visible to observers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum GenEventKind {
    /// The run advanced to a new phase. Fired for every transition.
    StateChanged { state: DungeonState },
    /// A placement was validated and committed.
    TilePlaced {
        tile: TileId,
        template: String,
        path: PathKind,
    },
    /// A provisional placement collided and was rolled back.
    /// `attempts` is the consecutive-failure count at the frontier.
    TileDiscarded { template: String, attempts: u32 },
    /// A previously committed tile was destroyed by a backtracking rewind.
    TileRemoved { tile: TileId },
    /// Branch generation began at a root drawn from the available pool.
    BranchStarted { index: u32, root: TileId },
    /// A branch could not continue and was curtailed.
    BranchAbandoned { index: u32 },
    /// Cleanup sealed the run's remaining open connectors.
    DeadEndsBlocked { count: usize },
    /// The run reached `Completed`.
    RunCompleted,
    /// The run reached `Failed`; the main path cannot be completed.
    RunFailed { reason: String },
    /// A `Cancel` command was honored at a suspension point.
    RunCancelled,
    /// A `Restart` command tore the run down for a fresh seed.
    RunRestarted { seed: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_queue_ordering() {
        let mut queue = StepQueue::new();
        // Schedule out of order.
        queue.schedule(100);
        queue.schedule(50);
        queue.schedule(50);

        // Should pop in tick order, then sequence order within a tick.
        let first = queue.pop_if_ready(200).unwrap();
        assert_eq!(first.tick, 50);
        assert_eq!(first.sequence, 1);

        let second = queue.pop_if_ready(200).unwrap();
        assert_eq!(second.tick, 50);
        assert_eq!(second.sequence, 2);

        let third = queue.pop_if_ready(200).unwrap();
        assert_eq!(third.tick, 100);

        assert!(queue.pop_if_ready(200).is_none());
    }

    #[test]
    fn pop_if_ready_respects_tick_limit() {
        let mut queue = StepQueue::new();
        queue.schedule(100);

        // Not ready yet.
        assert!(queue.pop_if_ready(99).is_none());
        // Ready now.
        assert!(queue.pop_if_ready(100).is_some());
    }

    #[test]
    fn clear_drops_pending_steps() {
        let mut queue = StepQueue::new();
        queue.schedule(10);
        queue.schedule(20);
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.pop_if_ready(u64::MAX).is_none());
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = GenEvent {
            tick: 42,
            kind: GenEventKind::TilePlaced {
                tile: crate::types::TileId(3),
                template: "corridor".into(),
                path: PathKind::Branch(1),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        let restored: GenEvent = serde_json::from_str(&json).unwrap();
        // GenEventKind doesn't derive PartialEq (unnecessary overhead for
        // an enum with String fields), so verify via re-serialization.
        assert_eq!(json, serde_json::to_string(&restored).unwrap());
    }
}
