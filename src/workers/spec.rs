//! # Worker declaration.
//!
//! [`WorkerSpec`] is the descriptor handed to [`App::add_thread`](crate::App::add_thread):
//! the unit of work plus everything the supervisor needs to run it.
//!
//! ## Defaults
//! - owner: the supervisor
//! - unrecognized commands: [`Cadence::default_unrecognized`]
//! - no parameters
//! - no autostart (the worker waits in `CREATED` for its first START)

use serde_json::Value;

use crate::workers::{Cadence, Params, UnrecognizedPolicy, Work};

/// Descriptor of one worker, consumed at registration.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use threadvisor::{Cadence, WorkFn, WorkerSpec};
///
/// let spec = WorkerSpec::new("poller", Cadence::Interval(Duration::from_millis(250)), WorkFn::new(|_| Ok(())))
///     .with_owner("controller")
///     .with_param("threshold", 10)
///     .autostart();
///
/// assert_eq!(spec.owner(), Some("controller"));
/// assert!(spec.is_autostart());
/// ```
pub struct WorkerSpec {
    name: String,
    owner: Option<String>,
    cadence: Cadence,
    unrecognized: Option<UnrecognizedPolicy>,
    params: Params,
    autostart: bool,
    work: Box<dyn Work>,
}

impl WorkerSpec {
    pub fn new(name: impl Into<String>, cadence: Cadence, work: impl Work) -> Self {
        Self {
            name: name.into(),
            owner: None,
            cadence,
            unrecognized: None,
            params: Params::new(),
            autostart: false,
            work: Box::new(work),
        }
    }

    /// Sets a delegated owner (another worker). Defaults to the supervisor.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Overrides the unknown-command policy.
    pub fn with_unrecognized(mut self, policy: UnrecognizedPolicy) -> Self {
        self.unrecognized = Some(policy);
        self
    }

    /// Declares a parameter with its initial value.
    ///
    /// Only declared parameters can be changed by `THREAD_UPDATE`.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// The supervisor sends START to this worker as soon as it runs.
    pub fn autostart(mut self) -> Self {
        self.autostart = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared owner, `None` meaning the supervisor.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Effective unknown-command policy.
    pub fn unrecognized(&self) -> UnrecognizedPolicy {
        self.unrecognized
            .unwrap_or_else(|| self.cadence.default_unrecognized())
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn is_autostart(&self) -> bool {
        self.autostart
    }

    pub(crate) fn into_work(self) -> Box<dyn Work> {
        self.work
    }
}

impl std::fmt::Debug for WorkerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerSpec")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("cadence", &self.cadence)
            .field("unrecognized", &self.unrecognized())
            .field("params", &self.params)
            .field("autostart", &self.autostart)
            .finish_non_exhaustive()
    }
}
