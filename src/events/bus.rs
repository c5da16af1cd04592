//! # Event bus for broadcasting engine events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources (dispatcher, lanes, engine).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                  Consumers:
//!   Dispatcher ──┐              ┌─ tap (unbounded mpsc) ─► engine listener ─► SubscriberSet
//!   Lane 0..N  ──┼──────► Bus ──┤
//!   Drain      ──┤              └─ broadcast ring ───────► Engine::events() receivers
//!   Engine     ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks a lane or the dispatcher.
//! - **Lossless tap**: the tap keeps every event until its receiver reads it.
//! - **Bounded ring**: broadcast receivers that fall behind get
//!   `RecvError::Lagged(n)` and skip `n` items.
//! - **No persistence**: ring events are lost if no receiver exists at send time.

use tokio::sync::{broadcast, mpsc};

use super::event::Event;

/// Broadcast channel for engine events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
    tap: Option<mpsc::UnboundedSender<Event>>,
}

impl Bus {
    /// Creates a new bus with the given ring capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx, tap: None }
    }

    /// Creates a bus that also copies every event into `tap`.
    pub fn with_tap(capacity: usize, tap: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            tap: Some(tap),
            ..Self::new(capacity)
        }
    }

    /// Publishes an event to the tap and to all active ring receivers.
    ///
    /// Ring receivers that do not exist at send time never see the event.
    pub fn publish(&self, ev: Event) {
        if let Some(tap) = &self.tap {
            let _ = tap.send(ev.clone());
        }
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
