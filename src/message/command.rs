//! # Message commands.
//!
//! [`Command`] is the closed set of intents a [`Message`](crate::Message) can carry.
//! Anything outside the built-in set lands in [`Command::Other`], which every
//! receiver resolves through its explicit fallback arm.
//!
//! ## Wire names
//! ```text
//! THREAD_START        run (or resume) the worker
//! THREAD_STOP         pause a repeating/interval worker
//! THREAD_END          stop the worker permanently
//! THREAD_UPDATE       stage parameter updates
//! THREAD_HANDLE       invoke the custom handler
//! THREAD_SUBSCRIBE    attach a subscriber to an endpoint   (supervisor)
//! THREAD_UNSUBSCRIBE  detach a subscriber from an endpoint (supervisor)
//! SET_LOOP_TIMER      change the cadence of an interval worker
//! ACTIVE_THREADS      query worker states                  (supervisor)
//! DATA                endpoint publication
//! ERROR               error report
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Intent carried by a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Command {
    ThreadStart,
    ThreadStop,
    ThreadEnd,
    ThreadUpdate,
    ThreadHandle,
    ThreadSubscribe,
    ThreadUnsubscribe,
    SetLoopTimer,
    ActiveThreads,
    Data,
    Error,
    /// Any command outside the built-in set.
    Other(String),
}

impl Command {
    /// Returns the wire name of the command.
    pub fn as_str(&self) -> &str {
        match self {
            Command::ThreadStart => "THREAD_START",
            Command::ThreadStop => "THREAD_STOP",
            Command::ThreadEnd => "THREAD_END",
            Command::ThreadUpdate => "THREAD_UPDATE",
            Command::ThreadHandle => "THREAD_HANDLE",
            Command::ThreadSubscribe => "THREAD_SUBSCRIBE",
            Command::ThreadUnsubscribe => "THREAD_UNSUBSCRIBE",
            Command::SetLoopTimer => "SET_LOOP_TIMER",
            Command::ActiveThreads => "ACTIVE_THREADS",
            Command::Data => "DATA",
            Command::Error => "ERROR",
            Command::Other(s) => s,
        }
    }

    /// Lifecycle commands are only accepted from the worker's owner or the supervisor.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Command::ThreadStart
                | Command::ThreadStop
                | Command::ThreadEnd
                | Command::ThreadUpdate
                | Command::SetLoopTimer
        )
    }
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        match s {
            "THREAD_START" => Command::ThreadStart,
            "THREAD_STOP" => Command::ThreadStop,
            "THREAD_END" => Command::ThreadEnd,
            "THREAD_UPDATE" => Command::ThreadUpdate,
            "THREAD_HANDLE" => Command::ThreadHandle,
            "THREAD_SUBSCRIBE" => Command::ThreadSubscribe,
            "THREAD_UNSUBSCRIBE" => Command::ThreadUnsubscribe,
            "SET_LOOP_TIMER" => Command::SetLoopTimer,
            "ACTIVE_THREADS" => Command::ActiveThreads,
            "DATA" => Command::Data,
            "ERROR" => Command::Error,
            other => Command::Other(other.to_string()),
        }
    }
}

impl From<String> for Command {
    fn from(s: String) -> Self {
        match Command::from(s.as_str()) {
            Command::Other(_) => Command::Other(s),
            known => known,
        }
    }
}

impl From<Command> for String {
    fn from(c: Command) -> Self {
        match c {
            Command::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Command {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Command::from(s))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
