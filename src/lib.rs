//! # lanepool
//!
//! **lanepool** is a bounded-concurrency job engine for tokio.
//!
//! Callers submit string payloads; the engine buffers them, fans them out
//! across a fixed set of execution lanes and runs one shared handler on each
//! job under a per-job deadline. Handler errors and panics stay inside their
//! job. On shutdown every job already accepted is still handed to the handler
//! exactly once before the engine reports terminal.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller ── submit(ctx, payload) ──┐        (fixed backoff while full)
//!                                    ▼
//!                          ┌───────────────────┐
//!                          │   intake queue    │  capacity = intake_capacity
//!                          └─────────┬─────────┘
//!                                    ▼
//!                          ┌───────────────────┐
//!                          │    Dispatcher     │  round-robin, skips full lanes,
//!                          │                   │  parks on "space" when all full
//!                          └──┬──────┬──────┬──┘
//!                             ▼      ▼      ▼
//!                         [lane 0][lane 1][lane N]   capacity = intake / lanes
//!                             │      │      │
//!                        LaneWorker  ...  LaneWorker  (sequential per lane)
//!                             │      │      │
//!                             └──────┼──────┘
//!                                    ▼
//!                           TimeoutGuard ─► handler(ctx, payload)
//!                                    │
//!   Events ◄─────────────────────────┘
//!     Bus ──(unbounded tap)──► listener ──► SubscriberSet ──► LogWriter / custom
//! ```
//!
//! ### Lifecycle
//! ```text
//! Created ──start()──► Running ──stop()──► ShuttingDown ──drain──► Terminated
//!    └─────────────────stop()──────────────────┘
//!
//! start():
//!   ├─► spawn lane workers, run dispatcher
//!   ├─► ... until stop() fires the shutdown token
//!   ├─► join dispatcher and lanes
//!   ├─► close intake + lanes, take leftovers (lanes, overflow list, intake)
//!   ├─► drain: one worker per lane, same guard and panic boundary
//!   └─► EngineTerminated, flush subscribers, return
//! ```
//!
//! ## Features
//! | Area              | Description                                                      | Key types / traits                       |
//! |-------------------|------------------------------------------------------------------|------------------------------------------|
//! | **Engine**        | Submit / Start / Stop facade with snapshots.                     | [`Engine`], [`EngineBuilder`]            |
//! | **Jobs**          | Handler definition as a trait or closure.                        | [`Handler`], [`HandlerFn`], [`HandlerRef`] |
//! | **Subscriber API**| Hook into lifecycle and per-job events.                          | [`Subscribe`], [`Event`], [`EventKind`]  |
//! | **Errors**        | Typed errors for submission and job execution.                   | [`EngineError`], [`JobError`]            |
//! | **Configuration** | Lane count, capacities, deadline, submit backoff.                | [`EngineConfig`]                         |
//!
//! ## Optional features
//! - `logging` _(default)_: exports the built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use lanepool::{Engine, EngineConfig, HandlerFn, JobError, Subscribe};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = EngineConfig::with_capacity(30);
//!     cfg.lanes = 3;
//!     cfg.timeout = Duration::from_secs(5);
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(lanepool::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!
//!     let handler = HandlerFn::arc(|ctx: CancellationToken, payload: String| async move {
//!         if ctx.is_cancelled() {
//!             return Err(JobError::Canceled);
//!         }
//!         println!("handling {payload}");
//!         Ok(())
//!     });
//!
//!     let engine = Engine::builder(cfg, handler).with_subscribers(subs).build();
//!
//!     for n in 0..9 {
//!         engine.submit(CancellationToken::new(), n.to_string()).await?;
//!     }
//!
//!     let runner = {
//!         let engine = Arc::clone(&engine);
//!         tokio::spawn(async move { engine.start().await })
//!     };
//!     engine.stop();
//!     runner.await??;
//!
//!     assert_eq!(engine.stats().finished(), 9);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod jobs;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{Engine, EngineBuilder, EngineConfig, EngineState, QueueDepths, StatsSnapshot};
pub use error::{EngineError, JobError};
pub use events::{Event, EventKind, Phase};
pub use jobs::{BoxJobFuture, Handler, HandlerFn, HandlerRef, Job, JobId};
pub use subscribers::{Subscribe, SubscriberSet};

// Built-in tracing subscriber.
// Disable with: `--no-default-features`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
