//! # Run a single unit of work.
//!
//! Executes one call into a worker's [`Work`] with panic isolation.
//!
//! ## Event flow
//!
//! ```text
//! Success:
//!   apply staged params → executions += 1 → work.run() → Ok(())
//!
//! Failure:
//!   work.run() → Err(Fail)             → returned as is
//!
//! Panic:
//!   work.run() → unwind → catch_unwind → Err(Panicked{ info })
//! ```
//!
//! ## Rules
//! - Runs on the worker's own thread, synchronously
//! - Staged parameter updates land **between** executions, never during one
//! - A panic never escapes: it is converted into [`WorkError::Panicked`]
//! - Events are not published here; the actor decides what a result means

use std::panic::{self, AssertUnwindSafe};

use crate::error::WorkError;
use crate::message::Message;
use crate::workers::{Context, Handling, Params, Work};

/// Runs `f`, converting a panic into [`WorkError::Panicked`].
pub fn guarded<T>(f: impl FnOnce() -> Result<T, WorkError>) -> Result<T, WorkError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(res) => res,
        Err(payload) => Err(WorkError::Panicked {
            info: crate::core::panic_message(&*payload),
        }),
    }
}

/// Executes one run of `work`.
///
/// ### Flow
/// 1. Move `staged` parameter updates into the context
/// 2. Bump the execution counter
/// 3. Call [`Work::run`] under [`guarded`]
pub fn run_once(work: &mut dyn Work, ctx: &mut Context, staged: &mut Params) -> Result<(), WorkError> {
    if !staged.is_empty() {
        let params = ctx.params_mut();
        for (key, value) in std::mem::take(staged) {
            params.insert(key, value);
        }
    }
    ctx.begin_execution();

    let ctx = &*ctx;
    guarded(|| work.run(ctx))
}

/// Calls [`Work::setup`] under [`guarded`].
pub fn setup(work: &mut dyn Work, ctx: &Context) -> Result<(), WorkError> {
    guarded(|| work.setup(ctx))
}

/// Calls [`Work::handle`] under [`guarded`].
pub fn handle(work: &mut dyn Work, ctx: &Context, message: &Message) -> Result<Handling, WorkError> {
    guarded(|| work.handle(ctx, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Command, Envelope};
    use crate::workers::WorkFn;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn context(params: Params) -> (Context, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = Context::new("A".into(), "manager".into(), "manager".into(), params, tx);
        (ctx, rx)
    }

    #[test]
    fn test_panic_becomes_work_error() {
        let (mut ctx, _rx) = context(Params::new());
        let mut work = WorkFn::new(|_ctx: &Context| -> Result<(), WorkError> { panic!("kaboom") });

        let err = run_once(&mut work, &mut ctx, &mut Params::new()).unwrap_err();
        assert_eq!(
            err,
            WorkError::Panicked {
                info: "kaboom".into()
            }
        );
        assert_eq!(ctx.executions(), 1);
    }

    #[test]
    fn test_staged_params_applied_before_run() {
        let mut params = Params::new();
        params.insert("count".into(), json!(1));
        let (mut ctx, _rx) = context(params);

        let mut staged = Params::new();
        staged.insert("count".into(), json!(5));

        let mut work = WorkFn::new(|ctx: &Context| {
            assert_eq!(ctx.param("count"), Some(&json!(5)));
            Ok(())
        });
        run_once(&mut work, &mut ctx, &mut staged).unwrap();
        assert!(staged.is_empty());
    }

    #[test]
    fn test_handle_default_is_unrecognized() {
        let (ctx, _rx) = context(Params::new());
        let mut work = WorkFn::new(|_ctx: &Context| Ok(()));
        let msg = Message::new(["manager"], ["A"], Command::ThreadHandle, None).unwrap();
        assert_eq!(handle(&mut work, &ctx, &msg), Ok(Handling::Unrecognized));
    }
}
