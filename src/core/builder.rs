//! # App: static application builder and entry point.
//!
//! Workers and outlets are registered before execution begins; [`App::run`]
//! consumes the builder, so nothing can be added once the application runs.
//!
//! ```text
//! App::new()
//!   ├─► add_thread(WorkerSpec)   (unique, non-reserved names)
//!   ├─► outlet("ui")             (external receiver sharing the namespace)
//!   ├─► handle()                 (AppHandle for injecting messages)
//!   └─► run() / run_blocking()   ──► Supervisor::run()
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::supervisor::{Assembly, Supervisor};
use crate::core::{AppHandle, SupervisorConfig};
use crate::error::{RuntimeError, SetupError};
use crate::message::{Envelope, Message};
use crate::observers::Observe;
use crate::workers::{Cadence, WorkerSpec};

/// Builder for a supervised application.
pub struct App {
    cfg: SupervisorConfig,
    names: BTreeSet<String>,
    workers: Vec<WorkerSpec>,
    outlets: Vec<(String, mpsc::UnboundedSender<Message>)>,
    observers: Vec<Arc<dyn Observe>>,
    inbox_tx: mpsc::UnboundedSender<Envelope>,
    inbox_rx: mpsc::UnboundedReceiver<Envelope>,
}

impl App {
    /// Creates an application with the default [`SupervisorConfig`].
    pub fn new() -> Self {
        Self::with_config(SupervisorConfig::default())
    }

    /// Creates an application with the given configuration.
    pub fn with_config(cfg: SupervisorConfig) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            cfg,
            names: BTreeSet::new(),
            workers: Vec::new(),
            outlets: Vec::new(),
            observers: Vec::new(),
            inbox_tx,
            inbox_rx,
        }
    }

    /// Sets lifecycle event observers.
    ///
    /// Observers receive runtime events (worker lifecycle, drops, shutdown)
    /// through dedicated tasks with bounded queues.
    pub fn with_observers(mut self, observers: Vec<Arc<dyn Observe>>) -> Self {
        self.observers = observers;
        self
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Registers a worker.
    ///
    /// # Errors
    /// - [`SetupError::DuplicateName`] if a worker or outlet already uses the name
    /// - [`SetupError::ReservedName`] if the name is the supervisor's
    /// - [`SetupError::InvalidCadence`] for `Cadence::Interval(Duration::ZERO)`
    pub fn add_thread(&mut self, spec: WorkerSpec) -> Result<(), SetupError> {
        if matches!(spec.cadence(), Cadence::Interval(period) if period.is_zero()) {
            return Err(SetupError::InvalidCadence {
                name: spec.name().to_string(),
            });
        }
        self.claim(spec.name())?;
        tracing::debug!(worker = %spec.name(), cadence = %spec.cadence(), "worker registered");
        self.workers.push(spec);
        Ok(())
    }

    /// Registers an outlet: a named destination whose messages are handed to the
    /// caller instead of a worker.
    ///
    /// Outlets can subscribe to endpoints and receive replies, which is how a GUI
    /// or a test observes the application.
    pub fn outlet(&mut self, name: &str) -> Result<mpsc::UnboundedReceiver<Message>, SetupError> {
        self.claim(name)?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.outlets.push((name.to_string(), tx));
        Ok(rx)
    }

    /// Returns a handle that injects messages into the supervisor inbox.
    pub fn handle(&self) -> AppHandle {
        AppHandle::new(self.inbox_tx.clone(), Arc::from(self.cfg.name.as_str()))
    }

    /// Names of registered workers, in registration order.
    pub fn workers(&self) -> impl Iterator<Item = &str> {
        self.workers.iter().map(WorkerSpec::name)
    }

    fn claim(&mut self, name: &str) -> Result<(), SetupError> {
        if name == self.cfg.name {
            return Err(SetupError::ReservedName {
                name: name.to_string(),
            });
        }
        if !self.names.insert(name.to_string()) {
            return Err(SetupError::DuplicateName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Runs the application until every worker stopped, a worker failed, or
    /// shutdown was requested.
    ///
    /// Must be called from within a tokio runtime; a multi-threaded runtime is
    /// recommended because each worker occupies a blocking thread.
    pub async fn run(self) -> Result<(), RuntimeError> {
        let App {
            cfg,
            workers,
            outlets,
            observers,
            inbox_tx,
            inbox_rx,
            ..
        } = self;

        tracing::info!(supervisor = %cfg.name, workers = workers.len(), "application starting");
        let assembly = Assembly {
            workers,
            outlets,
            inbox_tx,
            inbox_rx,
        };
        let res = Supervisor::new(cfg).run(assembly, observers).await;
        match &res {
            Ok(()) => tracing::info!("application finished"),
            Err(e) => tracing::error!(error = %e, label = e.as_label(), "application finished with error"),
        }
        res
    }

    /// Builds a multi-threaded tokio runtime and blocks on [`App::run`].
    ///
    /// Workers still stuck after the run are abandoned after the grace period.
    pub fn run_blocking(self) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        let res = rt.block_on(self.run());
        rt.shutdown_timeout(grace);
        res
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::{Context, WorkFn};
    use std::time::Duration;

    fn spec(name: &str) -> WorkerSpec {
        WorkerSpec::new(name, Cadence::Once, WorkFn::new(|_ctx: &Context| Ok(())))
    }

    #[test]
    fn test_duplicate_names_rejected_across_workers_and_outlets() {
        let mut app = App::new();
        app.add_thread(spec("A")).unwrap();

        assert_eq!(
            app.add_thread(spec("A")),
            Err(SetupError::DuplicateName { name: "A".into() })
        );
        assert!(matches!(
            app.outlet("A"),
            Err(SetupError::DuplicateName { .. })
        ));
        app.outlet("ui").unwrap();
        assert!(app.add_thread(spec("ui")).is_err());
        assert_eq!(app.workers().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn test_supervisor_name_is_reserved() {
        let mut app = App::new();
        assert_eq!(
            app.add_thread(spec("manager")),
            Err(SetupError::ReservedName {
                name: "manager".into()
            })
        );

        let cfg = SupervisorConfig {
            name: "root".into(),
            ..SupervisorConfig::default()
        };
        let mut app = App::with_config(cfg);
        assert!(app.add_thread(spec("manager")).is_ok());
        assert!(app.outlet("root").is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut app = App::new();
        let zero = WorkerSpec::new(
            "tick",
            Cadence::Interval(Duration::ZERO),
            WorkFn::new(|_ctx: &Context| Ok(())),
        );
        assert_eq!(
            app.add_thread(zero),
            Err(SetupError::InvalidCadence { name: "tick".into() })
        );
        assert_eq!(app.workers().count(), 0);
        assert!(app.outlet("tick").is_ok());
    }
}
