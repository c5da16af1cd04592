//! # Bounded FIFO used for the intake queue and every lane queue.
//!
//! ```text
//!   producer ── try_push ──► [ VecDeque (≤ capacity) ] ── pop / try_pop ──► consumer
//!                  │                                            │
//!                  └─► readable.notify_one()        space.notify_one() ◄─┘
//! ```
//!
//! ## Rules
//! - Capacity may be `0`: such a queue is permanently full.
//! - `try_push` never blocks; a full or closed queue hands the item back.
//! - Every successful pop signals `space`. Lane queues share one `space`
//!   signal so the dispatcher can wait for room in *any* lane.
//! - `close_and_take` closes and empties the queue in one critical section;
//!   later pushes fail with [`PushError::Closed`].
//!
//! Each queue has one producer and one consumer in steady state; the mutex
//! only guards the short push/pop sections and the final drain handoff.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// Rejected push; carries the item back to the caller.
#[derive(Debug)]
pub(crate) enum PushError<T> {
    /// Queue is at capacity.
    Full(T),
    /// Queue was closed for drain.
    Closed(T),
}

impl<T> PushError<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            PushError::Full(item) | PushError::Closed(item) => item,
        }
    }
}

struct Slots<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Bounded FIFO with async pop and a pluggable "space freed" signal.
pub(crate) struct BoundedQueue<T> {
    slots: Mutex<Slots<T>>,
    capacity: usize,
    readable: Notify,
    space: Arc<Notify>,
}

impl<T> BoundedQueue<T> {
    /// Creates a queue with its own space signal.
    pub(crate) fn new(capacity: usize) -> Self {
        Self::with_space_signal(capacity, Arc::new(Notify::new()))
    }

    /// Creates a queue that reports freed slots on a shared signal.
    pub(crate) fn with_space_signal(capacity: usize, space: Arc<Notify>) -> Self {
        Self {
            slots: Mutex::new(Slots {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            readable: Notify::new(),
            space,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots<T>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues `item` if there is room.
    pub(crate) fn try_push(&self, item: T) -> Result<(), PushError<T>> {
        {
            let mut slots = self.lock();
            if slots.closed {
                return Err(PushError::Closed(item));
            }
            if slots.items.len() >= self.capacity {
                return Err(PushError::Full(item));
            }
            slots.items.push_back(item);
        }
        self.readable.notify_one();
        Ok(())
    }

    /// Dequeues the oldest item, if any.
    pub(crate) fn try_pop(&self) -> Option<T> {
        let item = self.lock().items.pop_front();
        if item.is_some() {
            self.space.notify_one();
        }
        item
    }

    /// Waits for the oldest item. Returns `None` once the queue is closed and empty.
    ///
    /// Intended for the queue's single consumer: a push racing with the wait
    /// leaves a stored permit on `readable`, so no wakeup is lost.
    pub(crate) async fn pop(&self) -> Option<T> {
        loop {
            {
                let mut slots = self.lock();
                if let Some(item) = slots.items.pop_front() {
                    drop(slots);
                    self.space.notify_one();
                    return Some(item);
                }
                if slots.closed {
                    return None;
                }
            }
            self.readable.notified().await;
        }
    }

    /// Closes the queue and returns everything still buffered, oldest first.
    pub(crate) fn close_and_take(&self) -> VecDeque<T> {
        let items = {
            let mut slots = self.lock();
            slots.closed = true;
            std::mem::take(&mut slots.items)
        };
        self.readable.notify_waiters();
        items
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
