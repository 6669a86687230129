//! # Single-run and multi-run workers
//!
//! Demonstrates:
//! - `Cadence::Once` executes on the first START only
//! - `Cadence::PerSignal` executes once per START
//! - normal shutdown via THREAD_END to the supervisor
//!
//! Run with: `cargo run --example basic_runs --features logging`

use std::sync::Arc;
use std::time::Duration;

use threadvisor::{App, Cadence, Context, Observe, WorkFn, WorkerSpec};
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
            "A",
            Cadence::Once,
            WorkFn::new(|ctx: &Context| {
                println!("[{}] single run #{}", ctx.name(), ctx.executions());
                Ok(())
            }),
        )
        .with_owner("manager"),
    )?;
    app.add_thread(
        WorkerSpec::new(
            "B",
            Cadence::PerSignal,
            WorkFn::new(|ctx: &Context| {
                println!("[{}] run #{}", ctx.name(), ctx.executions());
                Ok(())
            }),
        )
        .with_owner("manager"),
    )?;

    let handle = app.handle();
    let run = tokio::spawn(app.run());

    // A runs once despite two STARTs; B runs twice.
    for name in ["A", "A", "B", "B"] {
        handle.start(name)?;
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.shutdown()?;
    run.await??;
    Ok(())
}
