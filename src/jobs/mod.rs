//! # Jobs and handlers.
//!
//! This module provides the job-related types:
//! - [`Job`] - one submitted work item (token + payload)
//! - [`JobId`] - per-engine monotonic identifier
//! - [`Handler`] - trait for the caller-supplied processing function
//! - [`HandlerFn`] - closure-backed handler
//! - [`HandlerRef`] - shared reference to a handler (`Arc<dyn Handler>`)

mod handler;
mod job;

pub use handler::{BoxJobFuture, Handler, HandlerFn, HandlerRef};
pub use job::{Job, JobId};
