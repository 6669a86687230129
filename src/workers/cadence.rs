//! # Execution cadence and unknown-command policy.
//!
//! One worker type covers every execution style; [`Cadence`] picks the style.
//!
//! ```text
//! Cadence::Once          START ─► run ─► STOPPED          (later STARTs: no-op)
//! Cadence::PerSignal     START ─► run, START ─► run, ...  until END
//! Cadence::Continuous    START ─► run ─► run ─► ...       until STOP / END
//! Cadence::Interval(d)   START ─► run @t0, t0+d, t0+2d    until STOP / END
//! ```
//!
//! Interval ticks that are missed because a run took longer than `d` are skipped,
//! never bursted.

use std::fmt;
use std::time::Duration;

/// How often a worker executes its unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Single-run: execute once after the first START, then stop.
    Once,
    /// Multi-run: execute once per START until END.
    PerSignal,
    /// Repeating: execute back to back after START until STOP or END.
    Continuous,
    /// Precise-repeating: execute on a fixed wall-clock interval after START.
    Interval(Duration),
}

impl Cadence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::Once => "once",
            Cadence::PerSignal => "per_signal",
            Cadence::Continuous => "continuous",
            Cadence::Interval(_) => "interval",
        }
    }

    /// `true` for cadences that keep executing without new START signals.
    pub fn is_repeating(&self) -> bool {
        matches!(self, Cadence::Continuous | Cadence::Interval(_))
    }

    /// Default handling of commands the worker does not implement.
    ///
    /// Every built-in cadence ignores them (with a `warn` log and a
    /// `CommandIgnored` event); override per worker with
    /// [`WorkerSpec::with_unrecognized`](crate::WorkerSpec::with_unrecognized).
    pub fn default_unrecognized(&self) -> UnrecognizedPolicy {
        match self {
            Cadence::Once => UnrecognizedPolicy::Ignore,
            Cadence::PerSignal => UnrecognizedPolicy::Ignore,
            Cadence::Continuous => UnrecognizedPolicy::Ignore,
            Cadence::Interval(_) => UnrecognizedPolicy::Ignore,
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Interval(d) => write!(f, "interval({d:?})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// What a worker does with a command it does not implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnrecognizedPolicy {
    /// Log at `warn` and drop the message.
    #[default]
    Ignore,
    /// Send an `ERROR` message back to the sender.
    Reply,
    /// Treat as a worker failure (fail-fast).
    Fail,
}
