//! # Publish/subscribe pipeline
//!
//! Demonstrates:
//! - an interval worker publishing on an endpoint
//! - a worker subscribing another worker to that endpoint
//! - an outlet receiving the processed results outside the application
//! - `THREAD_UPDATE` and `SET_LOOP_TIMER` while running
//!
//! ```text
//! sensor ──"reading"──► doubler ──DATA──► outlet "ui"
//! ```
//!
//! Run with: `cargo run --example pipeline`

use std::time::Duration;

use serde_json::json;
use threadvisor::{
    App, Cadence, Command, Context, Handling, Message, SupervisorConfig, Work, WorkError, WorkFn,
    WorkerSpec,
};
use tracing_subscriber::EnvFilter;

/// Doubles every reading it receives and forwards it to the "ui" outlet.
struct Doubler;

impl Work for Doubler {
    fn setup(&mut self, ctx: &Context) -> Result<(), WorkError> {
        ctx.subscribe("sensor", "reading", ctx.name());
        Ok(())
    }

    fn run(&mut self, _ctx: &Context) -> Result<(), WorkError> {
        Ok(())
    }

    fn handle(&mut self, ctx: &Context, message: &Message) -> Result<Handling, WorkError> {
        if message.command() != &Command::Data {
            return Ok(Handling::Unrecognized);
        }
        let value = message
            .payload()
            .and_then(|p| p["value"].as_f64())
            .ok_or_else(|| WorkError::fail("reading without value"))?;
        ctx.send(["ui"], Command::Data, Some(json!({ "doubled": value * 2.0 })))?;
        Ok(Handling::Handled)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut app = App::with_config(SupervisorConfig {
        grace: Duration::from_secs(2),
        ..SupervisorConfig::default()
    });
    app.add_thread(
        WorkerSpec::new(
            "sensor",
            Cadence::Interval(Duration::from_millis(250)),
            WorkFn::new(|ctx: &Context| {
                let offset = ctx.param("offset").and_then(|v| v.as_f64()).unwrap_or(0.0);
                ctx.publish("reading", json!({ "value": offset + ctx.executions() as f64 }));
                Ok(())
            }),
        )
        .with_param("offset", 0.0)
        .autostart(),
    )?;
    app.add_thread(WorkerSpec::new("doubler", Cadence::PerSignal, Doubler))?;
    let mut ui = app.outlet("ui")?;

    let handle = app.handle();
    let run = tokio::spawn(app.run());

    let mut received = 0;
    while let Some(msg) = ui.recv().await {
        println!("[ui] {msg}");
        received += 1;
        match received {
            4 => {
                handle.update("sensor", json!({ "offset": 100.0 }))?;
                handle.command("sensor", Command::SetLoopTimer, Some(json!({ "loop_timer": 0.1 })))?;
            }
            12 => {
                handle.shutdown()?;
                break;
            }
            _ => {}
        }
    }

    run.await??;
    Ok(())
}
