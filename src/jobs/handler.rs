//! # Handler abstraction and closure-backed implementation.
//!
//! This module defines the [`Handler`] trait and a convenient closure-backed
//! implementation [`HandlerFn`]. The common handle type is [`HandlerRef`], an
//! `Arc<dyn Handler>` shared by every lane.
//!
//! A handler receives a [`CancellationToken`] (a child of the token passed to
//! `submit`) and the job payload. The token is cancelled when the engine's
//! deadline fires, so long-running handlers can stop cooperatively.
//!
//! ## Concurrency semantics
//! - Every call produces a **new** `'static` future; the engine runs it on its
//!   own tokio task so a late or panicking handler never blocks a lane.
//! - Shared state must be captured explicitly (e.g. `Arc<...>` in the closure).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::JobError;

/// Boxed future returned by [`Handler::call`].
pub type BoxJobFuture = Pin<Box<dyn Future<Output = Result<(), JobError>> + Send + 'static>>;

/// Shared handle to a handler.
pub type HandlerRef = Arc<dyn Handler>;

/// # Caller-supplied job processor.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use lanepool::{BoxJobFuture, Handler, JobError};
///
/// struct Echo;
///
/// impl Handler for Echo {
///     fn call(&self, ctx: CancellationToken, payload: String) -> BoxJobFuture {
///         Box::pin(async move {
///             if ctx.is_cancelled() {
///                 return Err(JobError::Canceled);
///             }
///             println!("{payload}");
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Builds the future that processes one payload.
    fn call(&self, ctx: CancellationToken, payload: String) -> BoxJobFuture;
}

/// Closure-backed handler.
///
/// Wraps `F: Fn(CancellationToken, String) -> Fut`, producing a fresh future per job.
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new closure-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the handler and returns it as a shared handle.
    ///
    /// ## Example
    /// ```rust
    /// use tokio_util::sync::CancellationToken;
    /// use lanepool::{HandlerFn, HandlerRef, JobError};
    ///
    /// let h: HandlerRef = HandlerFn::arc(|_ctx: CancellationToken, payload: String| async move {
    ///     if payload.is_empty() {
    ///         return Err(JobError::fail("empty payload"));
    ///     }
    ///     Ok(())
    /// });
    /// # let _ = h;
    /// ```
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(CancellationToken, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), JobError>> + Send + 'static,
{
    fn call(&self, ctx: CancellationToken, payload: String) -> BoxJobFuture {
        Box::pin((self.f)(ctx, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handler_fn_passes_payload_through() {
        let h: HandlerRef = HandlerFn::arc(|_ctx: CancellationToken, payload: String| async move {
            if payload == "bad" {
                Err(JobError::fail("bad payload"))
            } else {
                Ok(())
            }
        });

        assert_eq!(h.call(CancellationToken::new(), "ok".into()).await, Ok(()));
        assert_eq!(
            h.call(CancellationToken::new(), "bad".into()).await,
            Err(JobError::fail("bad payload"))
        );
    }
}
