//! # Fail-fast shutdown
//!
//! Demonstrates:
//! - a continuous worker and an idle worker running alongside a flaky one
//! - the flaky worker failing on its third run
//! - every other worker being ended and `run()` returning the cause
//!
//! Run with: `cargo run --example fail_fast --features logging`

use std::sync::Arc;
use std::time::Duration;

use threadvisor::{App, Cadence, Context, Observe, RuntimeError, WorkError, WorkFn, WorkerSpec};
use tracing_subscriber::EnvFilter;

fn observers() -> Vec<Arc<dyn Observe>> {
    #[cfg(feature = "logging")]
    {
        vec![Arc::new(threadvisor::LogWriter::new())]
    }
    #[cfg(not(feature = "logging"))]
    {
        Vec::new()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut app = App::new().with_observers(observers());
    app.add_thread(
        WorkerSpec::new(
            "heartbeat",
            Cadence::Continuous,
            WorkFn::new(|ctx: &Context| {
                if ctx.executions() % 10 == 0 {
                    println!("[heartbeat] still alive ({})", ctx.executions());
                }
                std::thread::sleep(Duration::from_millis(20));
                Ok(())
            }),
        )
        .autostart(),
    )?;
    app.add_thread(
        WorkerSpec::new(
            "flaky",
            Cadence::Interval(Duration::from_millis(300)),
            WorkFn::new(|ctx: &Context| {
                println!("[flaky] attempt {}", ctx.executions());
                if ctx.executions() >= 3 {
                    return Err(WorkError::fail("sensor disconnected"));
                }
                Ok(())
            }),
        )
        .autostart(),
    )?;
    app.add_thread(WorkerSpec::new(
        "idle",
        Cadence::PerSignal,
        WorkFn::new(|_ctx: &Context| Ok(())),
    ))?;

    match app.run().await {
        Err(RuntimeError::WorkerFailed { name, owner, error }) => {
            println!("application stopped: worker {name} (owner {owner}) failed: {error}");
            Ok(())
        }
        other => Ok(other?),
    }
}
