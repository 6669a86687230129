//! # Lifecycle event observers.
//!
//! ```text
//! Worker / Supervisor ── publish(Event) ──► Bus ──► observer listener
//!                                                        │
//!                                                  ObserverSet::emit
//!                                               ┌────────┼────────┐
//!                                               ▼        ▼        ▼
//!                                           LogWriter  Metrics  Custom
//! ```
//!
//! - [`Observe`] extension trait
//! - [`ObserverSet`] per-observer queues with panic isolation
//! - `LogWriter` (feature `logging`) renders events through `tracing`

#[cfg(feature = "logging")]
mod log;
mod observer;
mod set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use observer::Observe;
pub use set::ObserverSet;
