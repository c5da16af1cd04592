//! # SubscriberSet: per-subscriber queues fed by the engine listener
//!
//! The engine listener forwards every bus event to [`SubscriberSet::deliver`],
//! which copies it into one bounded queue per subscriber and waits for room.
//! [`SubscriberSet::emit`] is the non-waiting variant.
//!
//! ```text
//!   engine listener ─► deliver(Event) ─┬─► slot "log-writer" [mpsc] ─► worker ─► on_event()
//!                                      ├─► slot "metrics"    [mpsc] ─► worker ─► on_event()
//!                                      └─► slot ...
//! ```
//!
//! ## Delivery
//! - Each subscriber sees events in bus order.
//! - `deliver` loses nothing while a worker is alive; a slow subscriber holds
//!   the caller until its queue has room.
//! - `emit` drops the event for a full subscriber only and bumps its dropped
//!   counter; nothing is retried.
//! - A panicking `on_event` is logged and the worker moves on to the next event.
//! - [`SubscriberSet::shutdown`] closes every queue and waits until each worker
//!   has handled what was already queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};

use crate::events::Event;

use super::Subscribe;

/// One subscriber's queue, worker and drop counter.
struct Slot {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
    worker: JoinHandle<()>,
    dropped: AtomicU64,
}

impl Slot {
    fn spawn(sub: Arc<dyn Subscribe>) -> Self {
        let name = sub.name();
        let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
        Self {
            name,
            tx,
            worker: tokio::spawn(run_worker(sub, rx)),
            dropped: AtomicU64::new(0),
        }
    }

    fn offer(&self, ev: &Arc<Event>) {
        let reason = match self.tx.try_send(Arc::clone(ev)) {
            Ok(()) => return,
            Err(TrySendError::Full(_)) => "queue full",
            Err(TrySendError::Closed(_)) => "worker gone",
        };
        self.record_drop(ev, reason);
    }

    async fn send(&self, ev: &Arc<Event>) {
        if self.tx.send(Arc::clone(ev)).await.is_err() {
            self.record_drop(ev, "worker gone");
        }
    }

    fn record_drop(&self, ev: &Event, reason: &'static str) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(subscriber = self.name, seq = ev.seq, reason, "event dropped");
    }
}

async fn run_worker(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>) {
    while let Some(ev) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(sub.on_event(&ev))
            .catch_unwind()
            .await;
        if handled.is_err() {
            tracing::warn!(
                subscriber = sub.name(),
                seq = ev.seq,
                kind = ?ev.kind,
                "subscriber panicked"
            );
        }
    }
}

/// Fan-out over a fixed list of subscribers.
pub struct SubscriberSet {
    slots: Vec<Slot>,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber. Must run inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        Self {
            slots: subs.into_iter().map(Slot::spawn).collect(),
        }
    }

    /// Queues `event` for every subscriber without waiting on any of them.
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        for slot in &self.slots {
            slot.offer(&ev);
        }
    }

    /// Queues `event` for every subscriber, waiting on each full queue in turn.
    pub async fn deliver(&self, event: Event) {
        let ev = Arc::new(event);
        for slot in &self.slots {
            slot.send(&ev).await;
        }
    }

    /// Events dropped so far for the subscriber called `name`.
    pub fn dropped(&self, name: &str) -> Option<u64> {
        self.slots
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.dropped.load(Ordering::Relaxed))
    }

    /// Closes every queue and waits for the workers to finish what is queued.
    pub async fn shutdown(self) {
        let mut workers = Vec::with_capacity(self.slots.len());
        for slot in self.slots {
            drop(slot.tx);
            workers.push(slot.worker);
        }
        for worker in workers {
            let _ = worker.await;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().unwrap().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Exploder;

    #[async_trait]
    impl Subscribe for Exploder {
        async fn on_event(&self, _ev: &Event) {
            panic!("subscriber test panic");
        }

        fn name(&self) -> &'static str {
            "exploder"
        }
    }

    struct Tiny(Mutex<usize>);

    #[async_trait]
    impl Subscribe for Tiny {
        async fn on_event(&self, _ev: &Event) {
            *self.0.lock().unwrap() += 1;
        }

        fn name(&self) -> &'static str {
            "tiny"
        }

        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_panicking_subscriber_does_not_affect_others() {
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![Arc::new(Exploder), rec.clone()]);
        assert_eq!(set.len(), 2);

        set.emit(&Event::new(EventKind::EngineStarted));
        set.emit(&Event::new(EventKind::EngineTerminated));
        set.shutdown().await;

        assert_eq!(
            *rec.seen.lock().unwrap(),
            vec![EventKind::EngineStarted, EventKind::EngineTerminated]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_overflow_drops_for_that_subscriber_only() {
        let tiny = Arc::new(Tiny(Mutex::new(0)));
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![tiny.clone(), rec.clone()]);

        // Workers cannot run until this task yields: the second emit overflows `tiny`.
        set.emit(&Event::new(EventKind::LaneStarted));
        set.emit(&Event::new(EventKind::LaneStopped));
        assert_eq!(set.dropped("tiny"), Some(1));
        assert_eq!(set.dropped("recorder"), Some(0));
        set.shutdown().await;

        assert_eq!(*tiny.0.lock().unwrap(), 1);
        assert_eq!(rec.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_deliver_waits_for_room_instead_of_dropping() {
        let tiny = Arc::new(Tiny(Mutex::new(0)));
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![tiny.clone(), rec.clone()]);

        for _ in 0..200 {
            set.deliver(Event::new(EventKind::JobCompleted)).await;
        }
        assert_eq!(set.dropped("tiny"), Some(0));
        set.shutdown().await;

        assert_eq!(*tiny.0.lock().unwrap(), 200);
        assert_eq!(rec.seen.lock().unwrap().len(), 200);
    }
}
