//! # Timeout guard: bounded-time execution of one handler invocation.
//!
//! - **Spawn** the handler future on its own tokio task with a child token
//! - **Race** the task's `JoinHandle` against `tokio::time::timeout`
//! - **Substitute** [`JobError::Timeout`] when the deadline wins
//!
//! ## Outcomes
//! ```text
//! handler finishes first  → its result, verbatim (Ok or Err)
//! deadline fires first    → child token cancelled, handle detached,
//!                           Err(JobError::Timeout { timeout })
//! handler panics          → panic resumed on the caller (lane boundary catches it)
//! handler task aborted    → Err(JobError::Canceled)
//! ```
//!
//! ## Rules
//! - A timed-out handler keeps running until it returns or honours its token;
//!   its late result is dropped with the detached handle and never blocks.
//! - A completed join always carries the real result, so "finished" and
//!   "deadline" can never be confused.
//! - The caller's token is never cancelled by the guard (child token only).

use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{error::JobError, jobs::HandlerRef};

/// Deadline-enforcement wrapper around the configured handler.
#[derive(Clone)]
pub(crate) struct TimeoutGuard {
    handler: HandlerRef,
    timeout: Duration,
}

impl TimeoutGuard {
    pub(crate) fn new(handler: HandlerRef, timeout: Duration) -> Self {
        Self { handler, timeout }
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the handler for one payload under the configured deadline.
    ///
    /// # Panics
    /// Re-raises a handler panic with its original payload so the calling
    /// lane can recover and report it.
    pub(crate) async fn call(
        &self,
        parent: &CancellationToken,
        payload: String,
    ) -> Result<(), JobError> {
        let child = parent.child_token();
        let fut = self.handler.call(child.clone(), payload);
        let mut handle = tokio::spawn(fut);

        match time::timeout(self.timeout, &mut handle).await {
            Ok(Ok(res)) => res,
            Ok(Err(join_err)) => match join_err.try_into_panic() {
                Ok(panic) => std::panic::resume_unwind(panic),
                Err(_cancelled) => Err(JobError::Canceled),
            },
            Err(_elapsed) => {
                child.cancel();
                drop(handle);
                Err(JobError::Timeout {
                    timeout: self.timeout,
                })
            }
        }
    }
}
