//! # Observer: user-facing lifecycle event handlers
//!
//! The [`Observe`] trait is the **extension point** for watching the runtime.
//! All lifecycle [`Event`]s flow through the bus and into observers.
//!
//! Each observer gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-observer bounded queue** (capacity via [`Observe::queue_capacity`])
//! - **Panic isolation** (panics are caught and reported as `EventKind::ObserverPanicked`)
//!
//! ## Architecture
//! ```text
//! ObserverSet ──► [bounded queue] ──► worker task ──► observer.on_event()
//!                                  └─► panic caught → EventKind::ObserverPanicked
//! ```
//!
//! Observers see *lifecycle* events only. To receive worker output, register an
//! outlet and subscribe it to an endpoint instead.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use async_trait::async_trait;
//! use threadvisor::{Event, EventKind, Observe};
//!
//! #[derive(Default)]
//! struct Failures(AtomicU64);
//!
//! #[async_trait]
//! impl Observe for Failures {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::WorkerFailed {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failures" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Lifecycle event observer.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Slow processing affects only this observer's queue.
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Processes a single event, in FIFO order per observer.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic events.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose; override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to a minimum of 1).
    ///
    /// On overflow the new event is dropped for this observer only and an
    /// `EventKind::ObserverOverflow` is published.
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
