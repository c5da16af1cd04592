//! # Event subscribers for the engine.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and built-in implementations for events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Dispatcher / LaneWorker / drain ── publish(Event) ──► Bus tap ──► engine listener
//!                                                                     │
//!                                                        SubscriberSet::deliver(Event)
//!                                                                     │
//!                                                        ┌────────────┼────────────┐
//!                                                        ▼            ▼            ▼
//!                                                    LogWriter     Metrics      Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use lanepool::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct PanicCounter;
//!
//! #[async_trait]
//! impl Subscribe for PanicCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::JobPanicked {
//!             // increment a counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "panic-counter" }
//! }
//! ```

mod set;
mod subscriber;

#[cfg(feature = "logging")]
mod embedded;

pub use set::SubscriberSet;
pub use subscriber::Subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
