//! # threadvisor
//!
//! **Threadvisor** runs a fixed set of named workers, each on its own OS thread,
//! and connects them through a single supervisor that routes addressed messages.
//!
//! Workers are declared up front, started and stopped by commands, publish data
//! on named endpoints that other workers (or outlets) subscribe to, and bring the
//! whole application down the moment one of them fails.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  WorkerSpec  │   │  WorkerSpec  │   │  WorkerSpec  │
//!     │ (Once)       │   │ (PerSignal)  │   │ (Interval)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  App::run() ──► Supervisor (single routing task)                  │
//! │  - Registry (worker inputs + outlets)                             │
//! │  - EndpointRegistry (owner, endpoint) → subscribers               │
//! │  - StateTracker (worker states with sequence numbers)             │
//! │  - Bus (broadcast lifecycle events)                               │
//! └──────┬──────────────────┬──────────────────┬───────────────▲──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │ Envelope
//!     │ WorkerActor  │   │ WorkerActor  │   │ WorkerActor  │   │ (Route /
//!     │ (OS thread)  │   │ (OS thread)  │   │ (OS thread)  │   │  Publish)
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ Context::publish / send / reply      │                │
//!      └──────────────────┴───────────────────┴────────────────┘
//!
//!   Lifecycle events:  WorkerActor / Supervisor ──► Bus ──► ObserverSet
//!                                                          ┌────┴────┐
//!                                                          ▼         ▼
//!                                                      LogWriter   custom
//! ```
//!
//! ### Worker lifecycle
//! ```text
//! CREATED ──START──► RUNNING ──END / single run done──► STOPPED
//!                       │
//!                       └──error / panic──► FAILED ──► fail-fast:
//!                                                      END to every worker,
//!                                                      run() returns WorkerFailed
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                      |
//! |-------------------|--------------------------------------------------------------|-----------------------------------------|
//! | **Messages**      | Addressed envelopes with command and JSON payload.           | [`Message`], [`Command`]                |
//! | **Workers**       | Units of work driven by a cadence.                           | [`Work`], [`WorkFn`], [`WorkerSpec`]    |
//! | **Supervision**   | Static application, routing, fail-fast shutdown.             | [`App`], [`AppHandle`]                  |
//! | **Endpoints**     | Publish/subscribe between workers.                           | [`EndpointRegistry`], [`Subscription`]  |
//! | **Observers**     | Hook into lifecycle events (logging, metrics, custom).       | [`Observe`], [`Event`]                  |
//! | **Errors**        | Typed errors for setup, work and runtime.                    | [`SetupError`], [`WorkError`], [`RuntimeError`] |
//! | **Configuration** | Centralize runtime settings.                                 | [`SupervisorConfig`]                    |
//!
//! ## Optional features
//! - `logging`: exports a built-in `LogWriter` observer rendering events via `tracing`.
//!
//! ## Example
//! ```rust
//! use threadvisor::{App, Cadence, Context, WorkFn, WorkerSpec};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = App::new();
//!
//!     app.add_thread(
//!         WorkerSpec::new("hello", Cadence::Once, WorkFn::new(|ctx: &Context| {
//!             println!("hello from {}", ctx.name());
//!             Ok(())
//!         }))
//!         .autostart(),
//!     )?;
//!
//!     // The single-run worker stops after its execution, so run() returns.
//!     app.run_blocking()?;
//!     Ok(())
//! }
//! ```
mod core;
mod endpoints;
mod error;
mod events;
mod message;
mod observers;
mod workers;

// ---- Public re-exports ----

pub use crate::core::{App, AppHandle, SupervisorConfig};
pub use endpoints::{EndpointRegistry, Subscription};
pub use error::{HandleError, MessageError, RuntimeError, SetupError, WorkError};
pub use events::{Bus, Event, EventKind};
pub use message::{Command, Message, Payload};
pub use observers::{Observe, ObserverSet};
pub use workers::{
    Cadence, Context, Handling, Params, UnrecognizedPolicy, Work, WorkFn, WorkerSpec, WorkerState,
};

// Optional: expose a built-in logging observer.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogWriter;
