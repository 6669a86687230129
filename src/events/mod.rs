//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the supervisor, worker threads
//! and observer workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! Lifecycle events are *about* the message flow; they never carry messages
//! themselves. Worker messages travel over the supervisor inbox instead.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
