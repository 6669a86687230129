//! # Supervisor: routes messages, owns worker threads, enforces fail-fast.
//!
//! The [`Supervisor`] owns the event bus, the state tracker, the destination
//! registry and the endpoint registry. It spawns one OS thread per worker and
//! then runs a single routing loop over its inbox.
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   Vec<WorkerSpec> + outlets + inbox  ──►  Supervisor::run()
//!
//! Preparation:
//!   - validate owners (SetupError::UnknownOwner)
//!   - observer_listener(): Bus.subscribe() ─► ObserverSet::emit(&Event)
//!   - Registry: worker inputs + outlets
//!
//! Spawn workers:
//!   WorkerSpec[0]  WorkerSpec[1]  ...  WorkerSpec[N-1]
//!        │              │                    │
//!        └──► WorkerActor::new(..)  (one per spec)
//!               └──► set.spawn_blocking(|| catch_unwind(handle.block_on(actor.run(child_token))))
//!   START ──► every autostart worker
//!
//! Routing loop (biased select!, joins first):
//!   join_next()  ── Stopped ─► close input, drop its subscriptions
//!                ── Failed  ─► fail_fast()
//!                ── None    ─► drain inbox, Ok(())   (every worker stopped)
//!   inbox.recv() ── Route(msg)    ─► Registry::resolve ─► worker / outlet / supervisor
//!                ── Publish{..}   ─► EndpointRegistry::publish ─► one copy per subscriber
//!   OS signal    ─► shutdown()
//!
//! Fail-fast path:
//!   tracing::error!(worker, owner, cause) ─► publish FailFast
//!   ─► END to every worker ─► runtime_token.cancel()
//!   ─► wait_all_with_grace() ─► Err(RuntimeError::WorkerFailed)
//! ```
//!
//! ## Rules
//! - Only this task mutates the registries
//! - A message for an unknown destination is a [`RuntimeError::Routing`] and halts
//!   the application the same way a failed worker does
//! - After a failure the inbox is no longer drained

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::core::actor::{ActorExit, ActorReport, WorkerActor, WorkerActorParams};
use crate::core::alive::{Reporter, StateTracker};
use crate::core::registry::{Delivery, Kind, Registry, Target};
use crate::core::{SupervisorConfig, shutdown};
use crate::endpoints::{EndpointRegistry, Subscription};
use crate::error::{RuntimeError, SetupError, WorkError};
use crate::events::{Bus, Event, EventKind};
use crate::message::{Command, Envelope, Message};
use crate::observers::{Observe, ObserverSet};
use crate::workers::{Context, WorkerSpec};

/// What the routing loop does next.
enum Flow {
    Continue,
    Shutdown,
}

/// Everything the builder collected before `run()`.
pub struct Assembly {
    pub workers: Vec<WorkerSpec>,
    pub outlets: Vec<(String, mpsc::UnboundedSender<Message>)>,
    pub inbox_tx: mpsc::UnboundedSender<Envelope>,
    pub inbox_rx: mpsc::UnboundedReceiver<Envelope>,
}

/// Coordinates worker threads, message routing and shutdown.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    reporter: Reporter,
    tracker: Arc<StateTracker>,
    registry: Registry,
    endpoints: EndpointRegistry,
    runtime_token: CancellationToken,
}

impl Supervisor {
    pub fn new(cfg: SupervisorConfig) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let tracker = Arc::new(StateTracker::new());
        let reporter = Reporter::new(bus.clone(), tracker.clone());
        let registry = Registry::new(cfg.name.clone());
        Self {
            cfg,
            bus,
            reporter,
            tracker,
            registry,
            endpoints: EndpointRegistry::new(),
            runtime_token: CancellationToken::new(),
        }
    }

    /// Runs the assembled application until every worker stopped, a worker
    /// failed, a routing error occurred, or shutdown was requested.
    pub async fn run(
        mut self,
        assembly: Assembly,
        observers: Vec<Arc<dyn Observe>>,
    ) -> Result<(), RuntimeError> {
        let Assembly {
            workers,
            outlets,
            inbox_tx,
            mut inbox_rx,
        } = assembly;

        self.validate_owners(&workers)?;
        let listener = self.observer_listener(observers);

        for (name, tx) in outlets {
            self.registry.insert(&name, Kind::Outlet, tx);
        }
        let mut set = JoinSet::new();
        let autostart = self.spawn_workers(&mut set, workers, &inbox_tx)?;
        for name in autostart {
            self.send_command(&name, Command::ThreadStart);
        }

        let res = self.route_until_done(&mut set, &mut inbox_rx).await;

        if let Some((done, join)) = listener {
            done.cancel();
            if tokio::time::timeout(self.cfg.grace, join).await.is_err() {
                tracing::warn!("observers did not drain within grace period");
            }
        }
        res
    }

    fn validate_owners(&self, workers: &[WorkerSpec]) -> Result<(), SetupError> {
        for spec in workers {
            let Some(owner) = spec.owner() else { continue };
            let known = owner == self.cfg.name || workers.iter().any(|w| w.name() == owner);
            if !known || owner == spec.name() {
                return Err(SetupError::UnknownOwner {
                    name: spec.name().to_string(),
                    owner: owner.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Subscribes to the bus and forwards events to the observer set.
    ///
    /// Returns a token that makes the listener drain what is buffered and exit.
    fn observer_listener(
        &self,
        observers: Vec<Arc<dyn Observe>>,
    ) -> Option<(CancellationToken, tokio::task::JoinHandle<()>)> {
        if observers.is_empty() {
            return None;
        }
        let set = ObserverSet::new(observers, self.bus.clone());
        let mut rx = self.bus.subscribe();
        let done = CancellationToken::new();
        let stop = done.clone();

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    ev = rx.recv() => match ev {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "observer listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => {
                        loop {
                            match rx.try_recv() {
                                Ok(ev) => set.emit(&ev),
                                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        });
        Some((done, join))
    }

    /// Spawns one blocking thread per worker; returns the names to autostart.
    fn spawn_workers(
        &mut self,
        set: &mut JoinSet<ActorReport>,
        workers: Vec<WorkerSpec>,
        inbox_tx: &mpsc::UnboundedSender<Envelope>,
    ) -> Result<Vec<String>, SetupError> {
        let supervisor: Arc<str> = Arc::from(self.cfg.name.as_str());
        let handle = Handle::current();
        let mut autostart = Vec::new();

        for spec in workers {
            let name: Arc<str> = Arc::from(spec.name());
            let owner: Arc<str> = spec.owner().map_or_else(|| supervisor.clone(), Arc::from);
            let owner_name = owner.to_string();

            let (input, inbox) = mpsc::unbounded_channel();
            if !self.registry.insert(&name, Kind::Worker, input) {
                return Err(SetupError::DuplicateName {
                    name: name.to_string(),
                });
            }
            self.tracker.register(&name);
            if spec.is_autostart() {
                autostart.push(name.to_string());
            }

            let ctx = Context::new(
                name.clone(),
                owner,
                supervisor.clone(),
                spec.params().clone(),
                inbox_tx.clone(),
            );
            let actor = WorkerActor::new(WorkerActorParams {
                cadence: spec.cadence(),
                unrecognized: spec.unrecognized(),
                ctx,
                inbox,
                reporter: self.reporter.clone(),
                work: spec.into_work(),
            });

            let child = self.runtime_token.child_token();
            let handle = handle.clone();
            let reporter = self.reporter.clone();
            let (worker, owner) = (name.to_string(), owner_name);
            set.spawn_blocking(move || {
                std::panic::catch_unwind(AssertUnwindSafe(|| handle.block_on(actor.run(child))))
                    .unwrap_or_else(|payload| escaped_panic(&reporter, worker, owner, &*payload))
            });
            tracing::debug!(worker = %name, "worker thread spawned");
        }
        Ok(autostart)
    }

    async fn route_until_done(
        &mut self,
        set: &mut JoinSet<ActorReport>,
        inbox: &mut mpsc::UnboundedReceiver<Envelope>,
    ) -> Result<(), RuntimeError> {
        let signal = shutdown::shutdown_requested(self.cfg.handle_signals);
        tokio::pin!(signal);

        loop {
            tokio::select! {
                biased;
                joined = set.join_next() => match joined {
                    None => {
                        tracing::info!("all workers stopped");
                        return self.drain(inbox);
                    }
                    Some(res) => {
                        let report = self.on_joined(res);
                        if let ActorExit::Failed(error) = report.exit {
                            return self.fail_fast(set, report.name, report.owner, error).await;
                        }
                    }
                },
                Some(envelope) = inbox.recv() => match self.dispatch(envelope) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Shutdown) => return self.shutdown(set).await,
                    Err(e) => return self.abort(set, e).await,
                },
                _ = &mut signal => return self.shutdown(set).await,
            }
        }
    }

    /// Routes what workers sent before exiting; outlets still receive it.
    fn drain(&mut self, inbox: &mut mpsc::UnboundedReceiver<Envelope>) -> Result<(), RuntimeError> {
        while let Ok(envelope) = inbox.try_recv() {
            if let Flow::Shutdown = self.dispatch(envelope)? {
                break;
            }
        }
        Ok(())
    }

    /// Records a finished worker thread.
    fn on_joined(&mut self, res: Result<ActorReport, JoinError>) -> ActorReport {
        let report = match res {
            Ok(report) => report,
            // Only reachable when the runtime cancels a thread that never started.
            Err(e) => {
                let info = match e.try_into_panic() {
                    Ok(payload) => crate::core::panic_message(&*payload),
                    Err(e) => e.to_string(),
                };
                ActorReport {
                    name: "<unknown>".to_string(),
                    owner: self.cfg.name.clone(),
                    exit: ActorExit::Failed(WorkError::Panicked { info }),
                }
            }
        };

        self.registry.close(&report.name);
        self.endpoints.remove_subscriber(&report.name);
        tracing::debug!(worker = %report.name, exit = ?report.exit, "worker thread joined");
        report
    }

    fn dispatch(&mut self, envelope: Envelope) -> Result<Flow, RuntimeError> {
        match envelope {
            Envelope::Route(msg) => self.route(msg),
            Envelope::Publish {
                owner,
                endpoint,
                message,
            } => {
                let copies = match self.endpoints.publish(&owner, &endpoint, &message) {
                    Ok(copies) => copies,
                    Err(e) => {
                        tracing::warn!(worker = %owner, endpoint = %endpoint, error = %e, "publication dropped");
                        return Ok(Flow::Continue);
                    }
                };
                if copies.is_empty() {
                    tracing::trace!(worker = %owner, endpoint = %endpoint, "no subscribers");
                }
                for copy in copies {
                    if let Flow::Shutdown = self.route(copy)? {
                        return Ok(Flow::Shutdown);
                    }
                }
                Ok(Flow::Continue)
            }
        }
    }

    fn route(&mut self, msg: Message) -> Result<Flow, RuntimeError> {
        match self.registry.resolve(msg) {
            Target::Supervisor(msg) => self.on_command(msg),
            Target::Deliver(msg) => {
                self.deliver(msg);
                Ok(Flow::Continue)
            }
            Target::Unknown(msg) => Err(routing_error(&msg)),
        }
    }

    /// Delivers to a registered destination; closed inputs drop the message.
    fn deliver(&self, msg: Message) {
        let name = msg.destination().to_string();
        let command = msg.command().as_str().to_string();
        match self.registry.deliver(&name, msg) {
            Delivery::Sent => {}
            Delivery::Closed | Delivery::Unknown => {
                tracing::debug!(destination = %name, command = %command, "destination closed; message dropped");
                self.reporter.emit(
                    Event::new(EventKind::MessageDropped)
                        .with_worker(name)
                        .with_command(command)
                        .with_reason("destination closed"),
                );
            }
        }
    }

    fn on_command(&mut self, msg: Message) -> Result<Flow, RuntimeError> {
        match msg.command() {
            Command::ThreadSubscribe | Command::ThreadUnsubscribe => {
                self.on_subscription(&msg)?;
                Ok(Flow::Continue)
            }
            Command::ActiveThreads => {
                self.reply_active_threads(&msg);
                Ok(Flow::Continue)
            }
            Command::ThreadEnd => Ok(Flow::Shutdown),
            other => {
                tracing::warn!(sender = ?msg.sender(), command = %other, "supervisor ignores command");
                self.reporter.emit(
                    Event::new(EventKind::CommandIgnored)
                        .with_worker(self.cfg.name.as_str())
                        .with_command(other.as_str()),
                );
                Ok(Flow::Continue)
            }
        }
    }

    fn on_subscription(&mut self, msg: &Message) -> Result<(), RuntimeError> {
        let Some(sub) = Subscription::from_payload(msg.payload()) else {
            tracing::warn!(sender = ?msg.sender(), payload = ?msg.payload(), "malformed subscription request");
            self.reporter.emit(
                Event::new(EventKind::MessageDropped)
                    .with_worker(self.cfg.name.as_str())
                    .with_command(msg.command().as_str())
                    .with_reason("malformed subscription payload"),
            );
            return Ok(());
        };

        let owner_ok = self.registry.kind(&sub.owner) == Some(Kind::Worker);
        let subscriber_ok = self.registry.contains(&sub.subscriber);
        for (name, ok) in [(&sub.owner, owner_ok), (&sub.subscriber, subscriber_ok)] {
            if !ok {
                return Err(RuntimeError::Routing {
                    receiver: vec![name.clone()],
                    sender: msg.sender().to_vec(),
                    command: msg.command().as_str().to_string(),
                });
            }
        }

        let route = format!("{} -> {}", sub.endpoint, sub.subscriber);
        if let Command::ThreadSubscribe = msg.command() {
            if self.endpoints.subscribe(&sub.owner, &sub.endpoint, &sub.subscriber) {
                tracing::debug!(owner = %sub.owner, %route, "subscribed");
                self.reporter.emit(
                    Event::new(EventKind::SubscriptionAdded)
                        .with_worker(sub.owner.as_str())
                        .with_reason(route),
                );
            }
        } else if self.endpoints.unsubscribe(&sub.owner, &sub.endpoint, &sub.subscriber) {
            tracing::debug!(owner = %sub.owner, %route, "unsubscribed");
            self.reporter.emit(
                Event::new(EventKind::SubscriptionRemoved)
                    .with_worker(sub.owner.as_str())
                    .with_reason(route),
            );
        }
        Ok(())
    }

    /// Replies `{name: state}` to the sender; unreachable senders are skipped.
    fn reply_active_threads(&self, msg: &Message) {
        let states: Map<String, Value> = self
            .tracker
            .snapshot()
            .into_iter()
            .map(|(name, state)| (name, Value::from(state.as_str())))
            .collect();

        let reply = match Message::new(
            [self.cfg.name.as_str()],
            msg.sender().iter().cloned(),
            Command::ActiveThreads,
            Some(Value::Object(states)),
        ) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "cannot build ACTIVE_THREADS reply");
                return;
            }
        };
        match self.registry.resolve(reply) {
            Target::Deliver(reply) => self.deliver(reply),
            Target::Supervisor(_) | Target::Unknown(_) => {
                tracing::debug!(sender = ?msg.sender(), "ACTIVE_THREADS requester is not addressable");
            }
        }
    }

    /// Sends `command` from the supervisor to worker `name`.
    fn send_command(&self, name: &str, command: Command) {
        match Message::new([self.cfg.name.as_str()], [name], command, None) {
            Ok(msg) => self.deliver(msg),
            Err(e) => tracing::warn!(worker = %name, error = %e, "cannot build command"),
        }
    }

    /// Sends END to every worker.
    fn end_all(&self) {
        for name in self.registry.workers() {
            if let Ok(msg) = Message::new([self.cfg.name.as_str()], [name.as_str()], Command::ThreadEnd, None) {
                let _ = self.registry.deliver(&name, msg);
            }
        }
    }

    /// Normal shutdown: END to every worker, then wait up to the grace period.
    async fn shutdown(&mut self, set: &mut JoinSet<ActorReport>) -> Result<(), RuntimeError> {
        self.reporter.emit(Event::new(EventKind::ShutdownRequested));
        self.end_all();
        self.runtime_token.cancel();

        let failure = self.wait_all_with_grace(set).await?;
        match failure {
            Some(report) => match report.exit {
                ActorExit::Failed(error) => Err(RuntimeError::WorkerFailed {
                    name: report.name,
                    owner: report.owner,
                    error,
                }),
                ActorExit::Stopped => Ok(()),
            },
            None => Ok(()),
        }
    }

    /// Fail-fast: a worker failed, every other worker is ended.
    async fn fail_fast(
        &mut self,
        set: &mut JoinSet<ActorReport>,
        name: String,
        owner: String,
        error: WorkError,
    ) -> Result<(), RuntimeError> {
        tracing::error!(
            worker = %name,
            owner = %owner,
            cause = %error,
            "worker {name:?} (owner {owner:?}) failed: {error}; ending application"
        );
        self.reporter.emit(
            Event::new(EventKind::FailFast)
                .with_worker(name.as_str())
                .with_reason(error.as_message()),
        );
        self.end_all();
        self.runtime_token.cancel();

        if let Err(e) = self.wait_all_with_grace(set).await {
            tracing::error!(error = %e, "workers did not stop after failure");
        }
        Err(RuntimeError::WorkerFailed { name, owner, error })
    }

    /// Routing failure: halts the application like a failed worker.
    async fn abort(&mut self, set: &mut JoinSet<ActorReport>, error: RuntimeError) -> Result<(), RuntimeError> {
        tracing::error!(error = %error, "routing failed; ending application");
        self.reporter.emit(
            Event::new(EventKind::FailFast)
                .with_worker(self.cfg.name.as_str())
                .with_reason(error.to_string()),
        );
        self.end_all();
        self.runtime_token.cancel();

        if let Err(e) = self.wait_all_with_grace(set).await {
            tracing::error!(error = %e, "workers did not stop after routing failure");
        }
        Err(error)
    }

    /// Waits for all worker threads to finish within the configured grace period.
    ///
    /// Publishes [`EventKind::AllStoppedWithin`] on success, or
    /// [`EventKind::GraceExceeded`] on timeout and returns
    /// [`RuntimeError::GraceExceeded`] with the workers still alive. On success
    /// returns the first failed worker seen while waiting, if any.
    async fn wait_all_with_grace(
        &mut self,
        set: &mut JoinSet<ActorReport>,
    ) -> Result<Option<ActorReport>, RuntimeError> {
        let grace = self.cfg.grace;
        let mut failure = None;
        let done = async {
            while let Some(res) = set.join_next().await {
                let report = self.on_joined(res);
                if failure.is_none() && matches!(report.exit, ActorExit::Failed(_)) {
                    failure = Some(report);
                }
            }
        };

        match tokio::time::timeout(grace, done).await {
            Ok(()) => {
                self.reporter.emit(Event::new(EventKind::AllStoppedWithin));
                Ok(failure)
            }
            Err(_) => {
                self.reporter.emit(Event::new(EventKind::GraceExceeded));
                let stuck = self.tracker.live();
                tracing::warn!(?grace, ?stuck, "grace period exceeded");
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

/// Report for a worker thread that unwound outside the unit-of-work guard.
fn escaped_panic(
    reporter: &Reporter,
    name: String,
    owner: String,
    payload: &(dyn Any + Send),
) -> ActorReport {
    let error = WorkError::Panicked {
        info: crate::core::panic_message(payload),
    };
    reporter.emit(
        Event::new(EventKind::WorkerFailed)
            .with_worker(name.as_str())
            .with_reason(error.to_string()),
    );
    ActorReport {
        name,
        owner,
        exit: ActorExit::Failed(error),
    }
}

fn routing_error(msg: &Message) -> RuntimeError {
    RuntimeError::Routing {
        receiver: msg.receiver().to_vec(),
        sender: msg.sender().to_vec(),
        command: msg.command().as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::{Cadence, WorkFn};

    fn spec(name: &str) -> WorkerSpec {
        WorkerSpec::new(name, Cadence::Once, WorkFn::new(|_ctx: &Context| Ok(())))
    }

    #[test]
    fn test_owner_must_exist() {
        let sup = Supervisor::new(SupervisorConfig::default());
        let ok = vec![spec("A"), spec("B").with_owner("A"), spec("C").with_owner("manager")];
        assert!(sup.validate_owners(&ok).is_ok());

        let bad = vec![spec("A").with_owner("ghost")];
        assert_eq!(
            sup.validate_owners(&bad),
            Err(SetupError::UnknownOwner {
                name: "A".into(),
                owner: "ghost".into()
            })
        );

        let own = vec![spec("A").with_owner("A")];
        assert!(sup.validate_owners(&own).is_err());
    }

    #[test]
    fn test_routing_error_carries_addresses() {
        let msg = Message::new(["A"], ["ghost", "x"], Command::Data, None).unwrap();
        match routing_error(&msg) {
            RuntimeError::Routing {
                receiver,
                sender,
                command,
            } => {
                assert_eq!(receiver, vec!["ghost".to_string(), "x".to_string()]);
                assert_eq!(sender, vec!["A".to_string()]);
                assert_eq!(command, "DATA");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
