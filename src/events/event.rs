//! # Engine events emitted by the dispatcher, lane workers and drain.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Lifecycle events**: engine/lane/dispatcher start and stop, shutdown and drain
//! - **Routing events**: a job was assigned to a lane or parked in the overflow list
//! - **Outcome events**: the terminal outcome of one handler invocation
//!
//! The [`Event`] struct carries additional metadata such as timestamps, lane,
//! job id, phase, reasons and recovery traces.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use lanepool::{Event, EventKind, Phase};
//!
//! let ev = Event::new(EventKind::TimeoutHit)
//!     .with_lane(1)
//!     .with_phase(Phase::Steady)
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::TimeoutHit);
//! assert_eq!(ev.lane, Some(1));
//! assert_eq!(ev.timeout_ms, Some(5_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::jobs::JobId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle events ===
    /// `start` entered steady state.
    ///
    /// Sets:
    /// - `pending`: number of lanes
    EngineStarted,

    /// A lane worker entered its loop.
    ///
    /// Sets:
    /// - `lane`: lane index
    LaneStarted,

    /// A lane worker observed the shutdown signal and exited.
    ///
    /// Sets:
    /// - `lane`: lane index
    /// - `pending`: jobs left in its queue for drain
    LaneStopped,

    /// The dispatcher observed the shutdown signal and exited.
    ///
    /// Sets:
    /// - `pending`: jobs left in the intake queue
    DispatcherStopped,

    /// `stop` performed the `Running → ShuttingDown` transition.
    ShutdownRequested,

    /// Drain is about to flush leftovers.
    ///
    /// Sets:
    /// - `pending`: total leftover jobs (intake + lanes + overflow)
    DrainStarted,

    /// Every drain worker finished.
    ///
    /// Sets:
    /// - `pending`: number of jobs handled during drain
    DrainCompleted,

    /// Lane queues are closed; the engine is terminal. Always the last event.
    EngineTerminated,

    // === Routing events ===
    /// The dispatcher placed a job into a lane queue.
    ///
    /// Sets:
    /// - `lane`: chosen lane
    /// - `job`: job id
    JobAssigned,

    /// Shutdown was observed mid-scan; the job went to the overflow list.
    ///
    /// Sets:
    /// - `job`: job id
    JobOverflowed,

    // === Outcome events ===
    /// Handler returned `Ok(())`.
    ///
    /// Sets:
    /// - `lane`, `job`, `phase`
    JobCompleted,

    /// Handler returned an error (including the guard's timeout substitution).
    ///
    /// Sets:
    /// - `lane`, `job`, `phase`
    /// - `reason`: error message
    JobFailed,

    /// The timeout guard's deadline fired before the handler finished.
    /// Always followed by `JobFailed`.
    ///
    /// Sets:
    /// - `lane`, `job`, `phase`
    /// - `timeout_ms`: configured deadline
    TimeoutHit,

    /// Handler panicked; the panic was recovered and the job dropped.
    ///
    /// Sets:
    /// - `lane`, `job`, `phase`
    /// - `reason`: recovered panic value
    /// - `recovery_trace`: stack of the lane that recovered the panic, not of
    ///   the handler frame that raised it
    JobPanicked,
}

/// Which part of the engine lifecycle ran a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Regular lane worker loop.
    Steady,
    /// Post-shutdown flush of leftover jobs.
    Drain,
}

/// Engine event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Lane index, if applicable.
    pub lane: Option<usize>,
    /// Job identifier, if applicable.
    pub job: Option<JobId>,
    /// Lifecycle phase that executed the job.
    pub phase: Option<Phase>,
    /// Configured deadline in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Count attached to lifecycle events (leftovers, drained jobs, lanes).
    pub pending: Option<usize>,
    /// Human-readable reason (errors, recovered panic values).
    pub reason: Option<Arc<str>>,
    /// Backtrace of the lane worker taken where a panic was recovered.
    ///
    /// The handler's own frames have already unwound by then, so this locates
    /// the job in the engine, not the line that panicked.
    pub recovery_trace: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            lane: None,
            job: None,
            phase: None,
            timeout_ms: None,
            pending: None,
            reason: None,
            recovery_trace: None,
        }
    }

    /// Attaches a lane index.
    #[inline]
    pub fn with_lane(mut self, lane: usize) -> Self {
        self.lane = Some(lane);
        self
    }

    /// Attaches a job identifier.
    #[inline]
    pub fn with_job(mut self, job: JobId) -> Self {
        self.job = Some(job);
        self
    }

    /// Attaches the execution phase.
    #[inline]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attaches a deadline (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches a count.
    #[inline]
    pub fn with_pending(mut self, n: usize) -> Self {
        self.pending = Some(n);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a rendered recovery-site backtrace.
    #[inline]
    pub fn with_recovery_trace(mut self, trace: impl Into<Arc<str>>) -> Self {
        self.recovery_trace = Some(trace.into());
        self
    }

    /// True for the three per-job outcome kinds plus the timeout marker.
    #[inline]
    pub fn is_outcome(&self) -> bool {
        matches!(
            self.kind,
            EventKind::JobCompleted
                | EventKind::JobFailed
                | EventKind::TimeoutHit
                | EventKind::JobPanicked
        )
    }
}
