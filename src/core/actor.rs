//! # WorkerActor: drives one worker thread.
//!
//! Owns a worker's [`Work`], its [`Context`] and its input queue, and turns
//! incoming commands into executions according to the worker's [`Cadence`].
//!
//! ## Architecture
//! ```text
//! Supervisor ──spawn_blocking──► OS thread ──Handle::block_on──► WorkerActor::run()
//!
//! setup()
//! loop {
//!   select! (biased) {
//!     token cancelled       → exit STOPPED
//!     inbox.recv()          → on_message()
//!     interval tick         → execute()     (Interval, running, not paused)
//!     yield                 → execute()     (Continuous, running, not paused)
//!   }
//! }
//! ```
//!
//! ## Commands
//! ```text
//! THREAD_START    CREATED → RUNNING; Once runs then exits, PerSignal runs,
//!                 repeating cadences resume
//! THREAD_STOP     pause a repeating worker (stays RUNNING)
//! THREAD_END      exit STOPPED
//! THREAD_UPDATE   stage declared params for the next execution
//! SET_LOOP_TIMER  change the period of an Interval worker
//! anything else   Work::handle(), then UnrecognizedPolicy
//! ```
//!
//! ## Rules
//! - Lifecycle commands are accepted only from the owner or the supervisor
//! - The inbox is drained between executions, never during one
//! - Any [`WorkError`] is terminal: the actor publishes `WorkerFailed` and exits
//! - Exactly **one** terminal event (`WorkerStopped` or `WorkerFailed`) per actor

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::alive::Reporter;
use crate::core::runner;
use crate::error::WorkError;
use crate::events::{Event, EventKind};
use crate::message::{Command, Message};
use crate::workers::{Cadence, Context, Handling, Params, UnrecognizedPolicy, Work};

/// Why an actor exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorExit {
    /// END received, single run finished, or runtime cancelled.
    Stopped,
    /// The unit of work failed.
    Failed(WorkError),
}

/// Final record returned from the worker thread to the supervisor.
#[derive(Debug, Clone)]
pub struct ActorReport {
    pub name: String,
    pub owner: String,
    pub exit: ActorExit,
}

/// Result of handling one message.
enum Flow {
    Continue,
    Exit,
}

/// Runtime phase of a started worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Running,
    Paused,
}

/// Supervises the execution of a single worker.
pub struct WorkerActor {
    name: Arc<str>,
    owner: Arc<str>,
    supervisor: Arc<str>,
    cadence: Cadence,
    unrecognized: UnrecognizedPolicy,
    work: Box<dyn Work>,
    ctx: Context,
    inbox: mpsc::UnboundedReceiver<Message>,
    reporter: Reporter,
    staged: Params,
    phase: Phase,
    ticker: Option<Interval>,
}

/// Construction parameters for [`WorkerActor`].
pub struct WorkerActorParams {
    pub cadence: Cadence,
    pub unrecognized: UnrecognizedPolicy,
    pub work: Box<dyn Work>,
    pub ctx: Context,
    pub inbox: mpsc::UnboundedReceiver<Message>,
    pub reporter: Reporter,
}

impl WorkerActor {
    pub fn new(params: WorkerActorParams) -> Self {
        let WorkerActorParams {
            cadence,
            unrecognized,
            work,
            ctx,
            inbox,
            reporter,
        } = params;
        Self {
            name: Arc::from(ctx.name()),
            owner: Arc::from(ctx.owner()),
            supervisor: Arc::from(ctx.supervisor()),
            cadence,
            unrecognized,
            work,
            ctx,
            inbox,
            reporter,
            staged: Params::new(),
            phase: Phase::Created,
            ticker: None,
        }
    }

    /// Runs the worker until END, a finished single run, failure, or cancellation.
    ///
    /// ### Exit conditions
    /// - `THREAD_END` from the owner or the supervisor
    /// - `Cadence::Once` after its execution
    /// - the unit of work returns an error or panics (`Failed`)
    /// - `token` is cancelled or the inbox is closed
    pub async fn run(mut self, token: CancellationToken) -> ActorReport {
        let exit = match self.drive(&token).await {
            Ok(()) => ActorExit::Stopped,
            Err(e) => ActorExit::Failed(e),
        };

        let executions = self.ctx.executions();
        match &exit {
            ActorExit::Stopped => self.reporter.emit(
                Event::new(EventKind::WorkerStopped)
                    .with_worker(self.name.clone())
                    .with_executions(executions),
            ),
            ActorExit::Failed(e) => self.reporter.emit(
                Event::new(EventKind::WorkerFailed)
                    .with_worker(self.name.clone())
                    .with_reason(e.to_string())
                    .with_executions(executions),
            ),
        }

        ActorReport {
            name: self.name.to_string(),
            owner: self.owner.to_string(),
            exit,
        }
    }

    async fn drive(&mut self, token: &CancellationToken) -> Result<(), WorkError> {
        runner::setup(self.work.as_mut(), &self.ctx)?;

        loop {
            let active = self.phase == Phase::Running;
            let continuous = active && self.cadence == Cadence::Continuous;
            let interval = active && self.ticker.is_some();

            tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                msg = self.inbox.recv() => match msg {
                    Some(msg) => {
                        if let Flow::Exit = self.on_message(msg)? {
                            return Ok(());
                        }
                    }
                    None => return Ok(()),
                },
                _ = next_tick(&mut self.ticker), if interval => self.execute()?,
                _ = tokio::task::yield_now(), if continuous => self.execute()?,
            }
        }
    }

    fn execute(&mut self) -> Result<(), WorkError> {
        runner::run_once(self.work.as_mut(), &mut self.ctx, &mut self.staged)
    }

    fn on_message(&mut self, msg: Message) -> Result<Flow, WorkError> {
        if msg.command().is_lifecycle() && !self.is_authorized(&msg) {
            tracing::warn!(
                worker = %self.name,
                sender = ?msg.sender(),
                command = %msg.command(),
                "lifecycle command rejected: sender is neither owner nor supervisor"
            );
            self.reporter.emit(
                Event::new(EventKind::MessageDropped)
                    .with_worker(self.name.clone())
                    .with_command(msg.command().as_str())
                    .with_reason(format!("unauthorized sender {:?}", msg.sender())),
            );
            return Ok(Flow::Continue);
        }

        match msg.command() {
            Command::ThreadStart => self.on_start(),
            Command::ThreadStop => {
                self.on_stop();
                Ok(Flow::Continue)
            }
            Command::ThreadEnd => Ok(Flow::Exit),
            Command::ThreadUpdate => {
                self.on_update(msg.payload());
                Ok(Flow::Continue)
            }
            Command::SetLoopTimer => {
                self.on_loop_timer(&msg);
                Ok(Flow::Continue)
            }
            _ => {
                self.on_custom(&msg)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn is_authorized(&self, msg: &Message) -> bool {
        let origin = msg.origin();
        origin == &*self.owner || origin == &*self.supervisor
    }

    fn on_start(&mut self) -> Result<Flow, WorkError> {
        let first = self.phase == Phase::Created;
        match self.cadence {
            Cadence::Once => {
                self.mark_running();
                self.execute()?;
                Ok(Flow::Exit)
            }
            Cadence::PerSignal => {
                if first {
                    self.mark_running();
                }
                self.execute()?;
                Ok(Flow::Continue)
            }
            Cadence::Continuous | Cadence::Interval(_) => {
                if self.phase == Phase::Running {
                    tracing::debug!(worker = %self.name, "already running; START ignored");
                    return Ok(Flow::Continue);
                }
                self.mark_running();
                if let Cadence::Interval(period) = self.cadence {
                    self.ticker = Some(make_ticker(period, false));
                }
                Ok(Flow::Continue)
            }
        }
    }

    fn mark_running(&mut self) {
        self.phase = Phase::Running;
        self.reporter
            .emit(Event::new(EventKind::WorkerRunning).with_worker(self.name.clone()));
    }

    fn on_stop(&mut self) {
        if !self.cadence.is_repeating() || self.phase != Phase::Running {
            tracing::debug!(worker = %self.name, cadence = %self.cadence, "STOP has nothing to pause");
            return;
        }
        self.phase = Phase::Paused;
        self.ticker = None;
        self.reporter
            .emit(Event::new(EventKind::WorkerPaused).with_worker(self.name.clone()));
    }

    fn on_update(&mut self, payload: Option<&Value>) {
        let Some(Value::Object(updates)) = payload else {
            tracing::error!(worker = %self.name, "THREAD_UPDATE expects an object of parameters");
            return;
        };
        for (key, value) in updates {
            if self.ctx.params().contains_key(key) {
                self.staged.insert(key.clone(), value.clone());
            } else {
                tracing::error!(worker = %self.name, param = %key, "unknown parameter; update skipped");
            }
        }
    }

    fn on_loop_timer(&mut self, msg: &Message) {
        let Cadence::Interval(_) = self.cadence else {
            tracing::warn!(worker = %self.name, cadence = %self.cadence, "SET_LOOP_TIMER ignored");
            self.reporter.emit(
                Event::new(EventKind::CommandIgnored)
                    .with_worker(self.name.clone())
                    .with_command(msg.command().as_str()),
            );
            return;
        };

        let Some(period) = loop_timer(msg.payload()) else {
            tracing::error!(worker = %self.name, payload = ?msg.payload(), "SET_LOOP_TIMER expects positive seconds");
            return;
        };
        self.cadence = Cadence::Interval(period);
        if self.ticker.is_some() {
            self.ticker = Some(make_ticker(period, true));
        }
        tracing::debug!(worker = %self.name, ?period, "loop timer updated");
    }

    fn on_custom(&mut self, msg: &Message) -> Result<(), WorkError> {
        if let Handling::Handled = runner::handle(self.work.as_mut(), &self.ctx, msg)? {
            return Ok(());
        }

        match self.unrecognized {
            UnrecognizedPolicy::Ignore => {
                tracing::warn!(worker = %self.name, command = %msg.command(), "unrecognized command ignored");
                self.reporter.emit(
                    Event::new(EventKind::CommandIgnored)
                        .with_worker(self.name.clone())
                        .with_command(msg.command().as_str()),
                );
                Ok(())
            }
            UnrecognizedPolicy::Reply => {
                let body = json!({ "error": format!("unrecognized command {}", msg.command()) });
                self.ctx.reply(msg, Command::Error, Some(body))?;
                Ok(())
            }
            UnrecognizedPolicy::Fail => Err(WorkError::UnrecognizedCommand {
                command: msg.command().as_str().to_string(),
            }),
        }
    }
}

fn make_ticker(period: Duration, delay_first: bool) -> Interval {
    let mut ticker = if delay_first {
        time::interval_at(time::Instant::now() + period, period)
    } else {
        time::interval(period)
    };
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Reads a period from `{"loop_timer": secs}` or a bare number of seconds.
fn loop_timer(payload: Option<&Value>) -> Option<Duration> {
    let secs = match payload? {
        Value::Object(map) => map.get("loop_timer")?.as_f64()?,
        other => other.as_f64()?,
    };
    let period = Duration::try_from_secs_f64(secs).ok()?;
    if period.is_zero() || time::Instant::now().checked_add(period).is_none() {
        return None;
    }
    Some(period)
}
