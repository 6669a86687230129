//! # Worker state tracker with sequence-based ordering.
//!
//! Maintains the authoritative state of every registered worker, using event
//! sequence numbers to reject out-of-order updates.
//!
//! ## Architecture
//! ```text
//! worker thread / supervisor ──► Reporter::emit(ev) ──► StateTracker::update(&ev)
//!                                        │                       │
//!                                        ▼                       ▼
//!                                  Bus::publish(ev)    HashMap<String, Entry>
//!                                                        (name → {seq, state})
//! ```
//!
//! ## Rules
//! - Updates are applied synchronously, before the event reaches the bus, so a
//!   snapshot taken after a worker reported never misses that report.
//! - Only lifecycle events ([`EventKind::worker_state`]) change state.
//! - Events with `seq <= last_seq` are rejected (stale).
//! - Terminal states (`STOPPED`, `FAILED`) are never left.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::events::{Bus, Event};
use crate::workers::WorkerState;

#[derive(Debug, Clone, Copy)]
struct Entry {
    last_seq: u64,
    state: WorkerState,
}

/// Thread-safe tracker of worker states.
#[derive(Debug, Default)]
pub struct StateTracker {
    state: RwLock<BTreeMap<String, Entry>>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a worker in `CREATED`.
    pub fn register(&self, name: &str) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.entry(name.to_string()).or_insert(Entry {
            last_seq: 0,
            state: WorkerState::Created,
        });
    }

    /// Applies `ev` if it is newer than the last update for its worker.
    ///
    /// Returns `true` if the worker's state changed.
    pub fn update(&self, ev: &Event) -> bool {
        let (Some(name), Some(next)) = (ev.worker.as_deref(), ev.kind.worker_state()) else {
            return false;
        };

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = state.get_mut(name) else {
            return false;
        };
        if ev.seq <= entry.last_seq || entry.state.is_terminal() {
            return false;
        }
        entry.last_seq = ev.seq;
        let changed = entry.state != next;
        entry.state = next;
        changed
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<WorkerState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|e| e.state)
    }

    /// All workers and their states, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, WorkerState)> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, e)| (name.clone(), e.state))
            .collect()
    }

    /// Sorted names of workers that are not in a terminal state.
    pub fn live(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter(|(_, s)| !s.is_terminal())
            .map(|(name, _)| name)
            .collect()
    }
}

/// Records events in the tracker, then publishes them on the bus.
#[derive(Clone, Debug)]
pub struct Reporter {
    bus: Bus,
    tracker: std::sync::Arc<StateTracker>,
}

impl Reporter {
    pub fn new(bus: Bus, tracker: std::sync::Arc<StateTracker>) -> Self {
        Self { bus, tracker }
    }

    pub fn emit(&self, ev: Event) {
        self.tracker.update(&ev);
        self.bus.publish(ev);
    }
}
