//! # LogWriter: lifecycle events rendered through `tracing`
//!
//! Enabled via the `logging` feature. Install any `tracing` subscriber to see the
//! output.
//!
//! ## Example output
//! ```text
//! INFO  [running] worker="A"
//! INFO  [stopped] worker="A" executions=1
//! ERROR [failed] worker="B" executions=2 reason="execution failed: boom"
//! WARN  [fail-fast] worker="B"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::observers::Observe;

/// Observer that logs every event.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Observe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::WorkerRunning => tracing::info!("[running] worker={worker:?}"),
            EventKind::WorkerPaused => tracing::info!("[paused] worker={worker:?}"),
            EventKind::WorkerStopped => {
                tracing::info!("[stopped] worker={worker:?} executions={:?}", e.executions)
            }
            EventKind::WorkerFailed => tracing::error!(
                "[failed] worker={worker:?} executions={:?} reason={reason:?}",
                e.executions
            ),
            EventKind::MessageDropped => tracing::debug!(
                "[dropped] worker={worker:?} command={:?} reason={reason:?}",
                e.command
            ),
            EventKind::CommandIgnored => {
                tracing::warn!("[ignored] worker={worker:?} command={:?}", e.command)
            }
            EventKind::SubscriptionAdded => {
                tracing::info!("[subscribed] owner={worker:?} {reason}")
            }
            EventKind::SubscriptionRemoved => {
                tracing::info!("[unsubscribed] owner={worker:?} {reason}")
            }
            EventKind::ShutdownRequested => tracing::info!("[shutdown-requested]"),
            EventKind::FailFast => tracing::warn!("[fail-fast] worker={worker:?} {reason}"),
            EventKind::AllStoppedWithin => tracing::info!("[all-stopped-within-grace]"),
            EventKind::GraceExceeded => tracing::warn!("[grace-exceeded]"),
            EventKind::ObserverOverflow => {
                tracing::warn!("[observer-overflow] observer={worker} {reason}")
            }
            EventKind::ObserverPanicked => {
                tracing::error!("[observer-panicked] observer={worker} info={reason}")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
