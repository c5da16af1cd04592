//! # Submitted work item.
//!
//! A [`Job`] is created by `submit` and is immutable afterwards. Ownership
//! moves serially: intake queue → dispatcher → one lane queue → its lane
//! worker, and is dropped once the timeout guard returns.

use std::fmt;

use tokio_util::sync::CancellationToken;

/// Identifier assigned at submission, unique within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

impl JobId {
    /// Wraps a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// One unit of work: the caller's cancellation token plus a string payload.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    ctx: CancellationToken,
    payload: String,
}

impl Job {
    /// Creates a job.
    pub fn new(id: JobId, ctx: CancellationToken, payload: impl Into<String>) -> Self {
        Self {
            id,
            ctx,
            payload: payload.into(),
        }
    }

    /// Returns the job id.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Returns the caller's token.
    pub fn ctx(&self) -> &CancellationToken {
        &self.ctx
    }

    /// Returns the payload.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Consumes the job into its parts.
    pub fn into_parts(self) -> (JobId, CancellationToken, String) {
        (self.id, self.ctx, self.payload)
    }
}
