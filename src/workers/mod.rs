//! # Worker abstractions.
//!
//! - [`Work`] - the synchronous unit of work a worker thread executes
//! - [`WorkFn`] - closure-backed `Work`
//! - [`WorkerSpec`] - descriptor registered with [`App::add_thread`](crate::App::add_thread)
//! - [`Cadence`] - execution policy (once / per signal / continuous / interval)
//! - [`Context`] - what the work sees: name, owner, params, outputs
//! - [`WorkerState`] - CREATED / RUNNING / STOPPED / FAILED

mod cadence;
mod context;
mod spec;
mod state;
mod work;

pub use cadence::{Cadence, UnrecognizedPolicy};
pub use context::{Context, Params};
pub use spec::WorkerSpec;
pub use state::WorkerState;
pub use work::{Handling, Work, WorkFn};
