//! # Global runtime configuration.
//!
//! Provides [`SupervisorConfig`], centralized settings for the supervisor runtime,
//! passed to [`App::with_config`](crate::App::with_config).
//!
//! ## Sentinel values
//! - `grace = 0s` → do not wait for workers after ending them
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `name`: address of the supervisor in message paths
/// - `grace`: maximum wait for workers to stop after END on shutdown or fail-fast
/// - `bus_capacity`: lifecycle event ring buffer size (min 1)
/// - `handle_signals`: end all workers on SIGINT/SIGTERM/SIGQUIT (Ctrl-C on Windows)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Address of the supervisor; reserved, no worker may use it.
    pub name: String,

    /// Maximum time to wait for workers to stop once END has been sent.
    ///
    /// A worker blocked inside its unit of work cannot observe END; it is
    /// reported as stuck when the grace period runs out.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Whether OS termination signals trigger a graceful shutdown.
    pub handle_signals: bool,
}

impl SupervisorConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `name = "manager"`
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    /// - `handle_signals = true`
    fn default() -> Self {
        Self {
            name: "manager".to_string(),
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
            handle_signals: true,
        }
    }
}
