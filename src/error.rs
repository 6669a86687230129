//! Error types used by the threadvisor runtime and workers.
//!
//! - [`MessageError`]: a message could not be built (empty address path).
//! - [`SetupError`]: static setup was invalid; raised before any thread starts.
//! - [`WorkError`]: raised by (or on behalf of) a worker's unit of work.
//! - [`HandleError`]: a message could not be injected through an `AppHandle`.
//! - [`RuntimeError`]: terminal outcome of [`App::run`](crate::App::run).
//!
//! All enums provide `as_label` (stable snake_case for logs/metrics).

use std::time::Duration;
use thiserror::Error;

/// # Errors produced while building a [`Message`](crate::Message).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("message sender path is empty")]
    EmptySender,
    #[error("message receiver path is empty")]
    EmptyReceiver,
}

impl MessageError {
    pub fn as_label(&self) -> &'static str {
        match self {
            MessageError::EmptySender => "message_empty_sender",
            MessageError::EmptyReceiver => "message_empty_receiver",
        }
    }
}

/// # Errors raised during static setup.
///
/// These surface from [`App::add_thread`](crate::App::add_thread) immediately, or
/// from [`App::run`](crate::App::run) before any worker thread is spawned.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// A worker or outlet with this name is already registered.
    #[error("name {name:?} is already registered")]
    DuplicateName {
        /// The conflicting name.
        name: String,
    },

    /// The name collides with the supervisor's own address.
    #[error("name {name:?} is reserved for the supervisor")]
    ReservedName {
        /// The reserved name.
        name: String,
    },

    /// A worker declares an owner that is neither the supervisor nor a registered worker.
    #[error("worker {name:?} declares unknown owner {owner:?}")]
    UnknownOwner {
        /// Worker name.
        name: String,
        /// Declared owner.
        owner: String,
    },

    /// An interval cadence with a zero period.
    #[error("worker {name:?} declares a zero interval")]
    InvalidCadence {
        /// Worker name.
        name: String,
    },
}

impl SetupError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use threadvisor::SetupError;
    ///
    /// let err = SetupError::DuplicateName { name: "A".into() };
    /// assert_eq!(err.as_label(), "setup_duplicate_name");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SetupError::DuplicateName { .. } => "setup_duplicate_name",
            SetupError::ReservedName { .. } => "setup_reserved_name",
            SetupError::UnknownOwner { .. } => "setup_unknown_owner",
            SetupError::InvalidCadence { .. } => "setup_invalid_cadence",
        }
    }
}

/// # Errors produced by a worker's unit of work.
///
/// Any of these reaching the worker wrapper moves the worker to `FAILED` and
/// triggers fail-fast shutdown of the whole application.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkError {
    /// The unit of work reported a failure.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The unit of work panicked.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// The worker received a command it does not implement and its policy is `Fail`.
    #[error("unrecognized command {command:?}")]
    UnrecognizedCommand {
        /// Wire name of the command.
        command: String,
    },
}

impl WorkError {
    /// Convenience constructor for [`WorkError::Fail`].
    pub fn fail(error: impl std::fmt::Display) -> Self {
        WorkError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkError::Fail { .. } => "work_failed",
            WorkError::Panicked { .. } => "work_panicked",
            WorkError::UnrecognizedCommand { .. } => "work_unrecognized_command",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WorkError::Fail { error } => format!("error: {error}"),
            WorkError::Panicked { info } => format!("panic: {info}"),
            WorkError::UnrecognizedCommand { command } => format!("unrecognized: {command}"),
        }
    }
}

impl From<MessageError> for WorkError {
    fn from(e: MessageError) -> Self {
        WorkError::fail(e)
    }
}

/// # Errors returned by [`AppHandle`](crate::AppHandle).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// The application has finished; its inbox no longer accepts messages.
    #[error("application inbox is closed")]
    Closed,

    /// The message could not be built.
    #[error(transparent)]
    Message(#[from] MessageError),
}

impl HandleError {
    pub fn as_label(&self) -> &'static str {
        match self {
            HandleError::Closed => "handle_closed",
            HandleError::Message(e) => e.as_label(),
        }
    }
}

/// # Errors produced by the threadvisor runtime.
///
/// Returned by [`App::run`](crate::App::run) when the application did not shut
/// down normally.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Static setup was invalid; no worker was started.
    #[error("setup rejected: {0}")]
    Setup(#[from] SetupError),

    /// A message was addressed to a name the supervisor does not know.
    #[error("cannot route message to {receiver:?} (from {sender:?}, command {command})")]
    Routing {
        /// Receiver path of the offending message.
        receiver: Vec<String>,
        /// Sender path of the offending message.
        sender: Vec<String>,
        /// Command of the offending message.
        command: String,
    },

    /// A worker failed; every other worker was ended.
    #[error("worker {name:?} (owner {owner:?}) failed: {error}")]
    WorkerFailed {
        /// Failing worker.
        name: String,
        /// Its declared owner.
        owner: String,
        /// What went wrong.
        error: WorkError,
    },

    /// Shutdown grace period was exceeded; some workers did not stop in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Workers that had not stopped when the grace period ran out.
        stuck: Vec<String>,
    },

    /// The blocking entry point could not build its runtime.
    #[error("runtime i/o: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use threadvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Setup(_) => "runtime_setup",
            RuntimeError::Routing { .. } => "runtime_routing",
            RuntimeError::WorkerFailed { .. } => "runtime_worker_failed",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Io(_) => "runtime_io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_failed_message_names_worker_owner_and_cause() {
        let err = RuntimeError::WorkerFailed {
            name: "A".into(),
            owner: "manager".into(),
            error: WorkError::fail("disk full"),
        };
        let text = err.to_string();
        assert!(text.contains("\"A\""));
        assert!(text.contains("\"manager\""));
        assert!(text.contains("disk full"));
    }

    #[test]
    fn test_message_error_becomes_work_failure() {
        let err: WorkError = MessageError::EmptyReceiver.into();
        assert_eq!(err.as_label(), "work_failed");
        assert!(err.to_string().contains("receiver path is empty"));
    }

    #[test]
    fn test_setup_converts_into_runtime() {
        let err: RuntimeError = SetupError::ReservedName {
            name: "manager".into(),
        }
        .into();
        assert_eq!(err.as_label(), "runtime_setup");
    }
}
