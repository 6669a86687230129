use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a worker.
///
/// ```text
/// CREATED ──START──► RUNNING ──END / single run done──► STOPPED
///                       │
///                       └──error / panic──► FAILED (terminal, triggers fail-fast)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerState {
    Created,
    Running,
    Stopped,
    Failed,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Created => "CREATED",
            WorkerState::Running => "RUNNING",
            WorkerState::Stopped => "STOPPED",
            WorkerState::Failed => "FAILED",
        }
    }

    /// `true` for `STOPPED` and `FAILED`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Stopped | WorkerState::Failed)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
