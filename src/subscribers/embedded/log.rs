//! # LogWriter: engine events rendered through `tracing`
//!
//! A subscriber that turns each [`Event`] into one `tracing` record under the
//! `lanepool` target. It never installs a tracing subscriber; the embedding
//! process decides formatting and filtering.
//!
//! | Events                                   | Level   |
//! |------------------------------------------|---------|
//! | engine / lane / dispatcher / drain       | `info`  |
//! | `JobAssigned`, `JobCompleted`            | `debug` |
//! | `JobOverflowed`, `JobFailed`, `TimeoutHit` | `warn`  |
//! | `JobPanicked` (with recovery trace)      | `error` |
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO  lanepool: engine started lanes=3
//! DEBUG lanepool: job assigned lane=1 job=job-4
//! WARN  lanepool: job timed out lane=1 job=job-4 phase=Steady timeout_ms=1000
//! ERROR lanepool: recovered handler panic lane=2 job=job-9 phase=Drain panic="boom"
//! INFO  lanepool: drain completed handled=12
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let job = e.job.map(|id| id.to_string()).unwrap_or_default();
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::EngineStarted => {
                info!(target: "lanepool", lanes = e.pending, "engine started");
            }
            EventKind::LaneStarted => {
                info!(target: "lanepool", lane = e.lane, "lane started");
            }
            EventKind::LaneStopped => {
                info!(target: "lanepool", lane = e.lane, pending = e.pending, "lane stopped");
            }
            EventKind::DispatcherStopped => {
                info!(target: "lanepool", pending = e.pending, "dispatcher stopped");
            }
            EventKind::ShutdownRequested => {
                info!(target: "lanepool", "shutdown requested");
            }
            EventKind::DrainStarted => {
                info!(target: "lanepool", pending = e.pending, "drain started");
            }
            EventKind::DrainCompleted => {
                info!(target: "lanepool", handled = e.pending, "drain completed");
            }
            EventKind::EngineTerminated => {
                info!(target: "lanepool", "engine terminated");
            }
            EventKind::JobAssigned => {
                debug!(target: "lanepool", lane = e.lane, job = %job, "job assigned");
            }
            EventKind::JobCompleted => {
                debug!(target: "lanepool", lane = e.lane, job = %job, phase = ?e.phase, "job completed");
            }
            EventKind::JobOverflowed => {
                warn!(target: "lanepool", job = %job, "job parked in overflow list");
            }
            EventKind::TimeoutHit => {
                warn!(
                    target: "lanepool",
                    lane = e.lane,
                    job = %job,
                    phase = ?e.phase,
                    timeout_ms = e.timeout_ms,
                    "job timed out"
                );
            }
            EventKind::JobFailed => {
                warn!(target: "lanepool", lane = e.lane, job = %job, phase = ?e.phase, reason, "job failed");
            }
            EventKind::JobPanicked => {
                error!(
                    target: "lanepool",
                    lane = e.lane,
                    job = %job,
                    phase = ?e.phase,
                    panic = reason,
                    recovery_trace = e.recovery_trace.as_deref().unwrap_or(""),
                    "recovered handler panic"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
