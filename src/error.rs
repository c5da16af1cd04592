//! Error types used by the lanepool engine and job handlers.
//!
//! This module defines two main error enums:
//!
//! - [`EngineError`]: errors returned synchronously by the engine facade.
//! - [`JobError`]: outcomes of a single handler invocation.
//!
//! Both types provide `as_label` for logs/metrics. A handler panic is never
//! converted into either type: it is caught at the lane boundary and reported
//! as [`EventKind::JobPanicked`](crate::EventKind::JobPanicked).

use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

/// # Errors returned by the engine facade.
///
/// Only submission-time and lifecycle misuse errors surface here. Execution
/// outcomes of accepted jobs are observable through events, never through the
/// original `submit` call.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The shutdown signal fired before the job could be enqueued.
    #[error("engine already closed")]
    AlreadyClosed,

    /// `start` was called more than once.
    #[error("engine already started")]
    AlreadyStarted,

    /// `try_submit` found the intake queue at capacity.
    #[error("intake queue is full")]
    IntakeFull,
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use lanepool::EngineError;
    ///
    /// assert_eq!(EngineError::AlreadyClosed.as_label(), "engine_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::AlreadyClosed => "engine_closed",
            EngineError::AlreadyStarted => "engine_started",
            EngineError::IntakeFull => "intake_full",
        }
    }
}

/// # Outcome errors of one handler invocation.
///
/// `Fail` and `Canceled` are produced by handlers and returned verbatim by the
/// timeout guard; `Timeout` is substituted by the guard when the deadline
/// elapses first.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Handler exceeded the configured per-job deadline.
    #[error("process timeout exceeded after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// Handler reported a failure.
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Handler observed cancellation of its token and gave up.
    #[error("job cancelled")]
    Canceled,
}

impl JobError {
    /// Shorthand for [`JobError::Fail`] from anything displayable.
    ///
    /// # Example
    /// ```
    /// use lanepool::JobError;
    ///
    /// let err = JobError::fail("disk full");
    /// assert_eq!(err.to_string(), "handler failed: disk full");
    /// ```
    pub fn fail(error: impl Display) -> Self {
        JobError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Timeout { .. } => "job_timeout",
            JobError::Fail { .. } => "job_failed",
            JobError::Canceled => "job_canceled",
        }
    }

    /// True for the guard-substituted deadline outcome.
    pub fn is_timeout(&self) -> bool {
        matches!(self, JobError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(EngineError::AlreadyStarted.as_label(), "engine_started");
        assert_eq!(EngineError::IntakeFull.as_label(), "intake_full");
        assert_eq!(
            JobError::Timeout {
                timeout: Duration::from_secs(1)
            }
            .as_label(),
            "job_timeout"
        );
        assert_eq!(JobError::Canceled.as_label(), "job_canceled");
    }

    #[test]
    fn test_fail_keeps_message() {
        let err = JobError::fail(format!("code {}", 7));
        assert_eq!(
            err,
            JobError::Fail {
                error: "code 7".into()
            }
        );
        assert!(!err.is_timeout());
    }
}
