//! Runtime core: orchestration and lifecycle.
//!
//! This module contains the embedded implementation of the threadvisor runtime.
//! The public API from this module is [`App`] (static builder and entry point),
//! [`AppHandle`] (message injection from outside) and [`SupervisorConfig`].
//!
//! Internal modules:
//! - [`runner`]: executes one unit of work with panic isolation;
//! - [`actor`]: drives a single worker thread through its cadence and commands;
//! - [`registry`]: address book resolving receiver paths to inputs;
//! - [`supervisor`]: routes messages, enforces fail-fast, handles shutdown;
//! - [`alive`]: sequence-ordered worker state tracking;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod actor;
mod alive;
mod builder;
mod config;
mod handle;
mod registry;
mod runner;
mod shutdown;
mod supervisor;

use std::any::Any;

pub use builder::App;
pub use config::SupervisorConfig;
pub use handle::AppHandle;

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
