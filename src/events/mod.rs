//! Engine events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the dispatcher, lane workers and
//! the shutdown/drain coordinator.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`Phase`] event classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Engine`, `Dispatcher`, `LaneWorker`, drain workers.
//! - **Consumer**: the engine's listener task, which fans out to the
//!   user-provided [`SubscriberSet`](crate::SubscriberSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, Phase};
