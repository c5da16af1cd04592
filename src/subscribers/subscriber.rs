//! # Subscribe: observing engine events from the outside.
//!
//! Implementations receive every [`Event`] the engine publishes, on a worker
//! task of their own. Lanes and the dispatcher never wait for a subscriber:
//! when its queue is full the engine listener holds the event until there is
//! room, so a slow subscriber delays delivery but loses nothing.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use async_trait::async_trait;
//! use lanepool::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct Timeouts(AtomicU64);
//!
//! #[async_trait]
//! impl Subscribe for Timeouts {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::TimeoutHit {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "timeouts" }
//!     fn queue_capacity(&self) -> usize { 4096 } // every job emits several events
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Receiver of engine events.
///
/// Keep `on_event` short and non-blocking; a panic inside it is caught and
/// logged, and the next event is delivered as usual.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event. Calls for one subscriber never overlap.
    async fn on_event(&self, event: &Event);

    /// Label used in drop and panic diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Bound of this subscriber's queue; values below 1 are raised to 1.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
