//! # Runtime events emitted by the supervisor and worker threads.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Worker lifecycle**: running, paused, stopped, failed
//! - **Messaging**: drops, ignored commands, subscription changes
//! - **Shutdown**: requested, fail-fast, grace outcome
//! - **Observer**: overflow and panics inside observers
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use threadvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkerFailed)
//!     .with_worker("A")
//!     .with_reason("boom")
//!     .with_executions(3);
//!
//! assert_eq!(ev.kind, EventKind::WorkerFailed);
//! assert_eq!(ev.worker.as_deref(), Some("A"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::workers::WorkerState;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Worker lifecycle ===
    /// Worker accepted START and is running.
    ///
    /// Sets: `worker`
    WorkerRunning,

    /// Repeating worker paused by THREAD_STOP (still `RUNNING`).
    ///
    /// Sets: `worker`
    WorkerPaused,

    /// Worker stopped (END, single run done, or shutdown).
    ///
    /// Sets: `worker`, `executions`
    WorkerStopped,

    /// Worker failed; terminal, triggers fail-fast.
    ///
    /// Sets: `worker`, `reason`, `executions`
    WorkerFailed,

    // === Messaging ===
    /// A message could not be delivered (destination already stopped, or
    /// lifecycle command from a non-owner).
    ///
    /// Sets: `worker` (destination), `command`, `reason`
    MessageDropped,

    /// A worker ignored a command it does not implement.
    ///
    /// Sets: `worker`, `command`
    CommandIgnored,

    /// Subscriber attached to an endpoint.
    ///
    /// Sets: `worker` (owner), `reason` (`endpoint -> subscriber`)
    SubscriptionAdded,

    /// Subscriber detached from an endpoint.
    ///
    /// Sets: `worker` (owner), `reason` (`endpoint -> subscriber`)
    SubscriptionRemoved,

    // === Shutdown ===
    /// Shutdown requested (OS signal or THREAD_END to the supervisor).
    ShutdownRequested,

    /// A worker failed; every other worker is being ended.
    ///
    /// Sets: `worker` (the failing one), `reason`
    FailFast,

    /// All workers stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time.
    GraceExceeded,

    // === Observer events ===
    /// Observer panicked during event processing.
    ///
    /// Sets: `worker` (observer name), `reason`
    ObserverPanicked,

    /// Observer dropped an event (queue full or worker closed).
    ///
    /// Sets: `worker` (observer name), `reason`
    ObserverOverflow,
}

impl EventKind {
    /// Worker state implied by this event, if any.
    pub fn worker_state(&self) -> Option<WorkerState> {
        match self {
            EventKind::WorkerRunning | EventKind::WorkerPaused => Some(WorkerState::Running),
            EventKind::WorkerStopped => Some(WorkerState::Stopped),
            EventKind::WorkerFailed => Some(WorkerState::Failed),
            _ => None,
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Worker (or observer) the event is about.
    pub worker: Option<Arc<str>>,
    /// Command involved, by wire name.
    pub command: Option<Arc<str>>,
    /// Human-readable reason (errors, drop details, etc.).
    pub reason: Option<Arc<str>>,
    /// Executions started by the worker so far.
    pub executions: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            command: None,
            reason: None,
            executions: None,
        }
    }

    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    #[inline]
    pub fn with_command(mut self, command: impl Into<Arc<str>>) -> Self {
        self.command = Some(command.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_executions(mut self, n: u64) -> Self {
        self.executions = Some(n);
        self
    }

    /// Creates an observer overflow event.
    #[inline]
    pub fn observer_overflow(observer: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::ObserverOverflow)
            .with_worker(observer)
            .with_reason(format!("observer={observer} reason={reason}"))
    }

    /// Creates an observer panic event.
    #[inline]
    pub fn observer_panicked(observer: &'static str, info: String) -> Self {
        Event::new(EventKind::ObserverPanicked)
            .with_worker(observer)
            .with_reason(info)
    }
}
