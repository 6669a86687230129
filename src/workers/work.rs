//! # Unit of work and closure-backed implementation.
//!
//! [`Work`] is what a worker thread executes. It is synchronous: every worker
//! owns a dedicated OS thread, so blocking inside [`Work::run`] only delays that
//! worker's own message handling.
//!
//! Errors returned from any method, and panics raised inside them, move the worker
//! to `FAILED` and shut the whole application down.
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use threadvisor::{Context, Work, WorkError};
//!
//! struct Counter {
//!     count: u64,
//! }
//!
//! impl Work for Counter {
//!     fn run(&mut self, ctx: &Context) -> Result<(), WorkError> {
//!         self.count += 1;
//!         ctx.publish("count", json!(self.count));
//!         Ok(())
//!     }
//! }
//! ```

use crate::error::WorkError;
use crate::message::Message;
use crate::workers::Context;

/// Result of offering a message to [`Work::handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    Handled,
    /// The work does not implement this message; the worker's
    /// [`UnrecognizedPolicy`](crate::UnrecognizedPolicy) applies.
    Unrecognized,
}

/// The body of a worker.
pub trait Work: Send + 'static {
    /// Called once on the worker thread before any message is processed.
    fn setup(&mut self, _ctx: &Context) -> Result<(), WorkError> {
        Ok(())
    }

    /// Executes the main unit of work once.
    ///
    /// Staged parameter updates are applied before this call, never during it.
    fn run(&mut self, ctx: &Context) -> Result<(), WorkError>;

    /// Receives `THREAD_HANDLE`, `DATA`, `ERROR` and custom commands.
    fn handle(&mut self, _ctx: &Context, _message: &Message) -> Result<Handling, WorkError> {
        Ok(Handling::Unrecognized)
    }
}

/// Closure-backed [`Work`] with no custom handler.
///
/// ```rust
/// use threadvisor::{Cadence, WorkFn, WorkerSpec};
///
/// let spec = WorkerSpec::new("tick", Cadence::PerSignal, WorkFn::new(|ctx| {
///     ctx.publish("ticks", ctx.executions());
///     Ok(())
/// }));
/// assert_eq!(spec.name(), "tick");
/// ```
pub struct WorkFn<F> {
    f: F,
}

impl<F> WorkFn<F>
where
    F: FnMut(&Context) -> Result<(), WorkError> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Work for WorkFn<F>
where
    F: FnMut(&Context) -> Result<(), WorkError> + Send + 'static,
{
    fn run(&mut self, ctx: &Context) -> Result<(), WorkError> {
        (self.f)(ctx)
    }
}

impl Work for Box<dyn Work> {
    fn setup(&mut self, ctx: &Context) -> Result<(), WorkError> {
        (**self).setup(ctx)
    }

    fn run(&mut self, ctx: &Context) -> Result<(), WorkError> {
        (**self).run(ctx)
    }

    fn handle(&mut self, ctx: &Context, message: &Message) -> Result<Handling, WorkError> {
        (**self).handle(ctx, message)
    }
}
