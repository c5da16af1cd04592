//! # Engine: the Submit / Start / Stop facade.
//!
//! The [`Engine`] owns the configuration, the intake queue, every lane queue,
//! the shutdown token and the event bus. It wires the dispatcher and lane
//! workers together and runs the drain once they have stopped.
//!
//! ## High-level architecture
//! ```text
//! submit(ctx, payload) ──► [intake] ──► Dispatcher ──► [lane 0] ──► LaneWorker 0 ─┐
//!   (fixed backoff while full)             │       ├──► [lane 1] ──► LaneWorker 1 ─┼─► TimeoutGuard ─► handler
//!                                          │       └──► [lane N] ──► LaneWorker N ─┘
//!                                          └─► overflow list (shutdown mid-scan)
//!
//! Event flow:
//!   Dispatcher / lanes / drain ── publish(Event) ──► Bus ──(unbounded tap)──► listener ──► SubscriberSet::deliver
//!
//! Shutdown path:
//!   stop()
//!     └─► state: Running | Created → ShuttingDown   (second call: no-op)
//!     └─► Bus.publish(ShutdownRequested)
//!     └─► shutdown.cancel()
//!   start() (still blocked)
//!     └─► dispatcher + lanes joined
//!     └─► intake and lanes closed + taken ─► drain::plan ─► drain::run
//!     └─► state = Terminated, Bus.publish(EngineTerminated)
//!     └─► listener flushed, start() returns
//! ```
//!
//! ## Rules
//! - Every job accepted by `submit` is handed to the handler exactly once,
//!   either by a lane worker or by a drain worker.
//! - `submit` after `stop` returns [`EngineError::AlreadyClosed`] and enqueues nothing.
//! - Every event published before `start` returns reaches every subscriber,
//!   whatever the bus ring capacity.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use lanepool::{Engine, EngineConfig, HandlerFn};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut cfg = EngineConfig::with_capacity(30);
//! cfg.timeout = Duration::from_secs(5);
//!
//! let handler = HandlerFn::arc(|_ctx: CancellationToken, payload: String| async move {
//!     let _ = payload;
//!     Ok(())
//! });
//! let engine = Engine::builder(cfg, handler).build();
//!
//! engine.submit(CancellationToken::new(), "hello").await.unwrap();
//! engine.stop();
//! engine.start().await.unwrap();
//! assert_eq!(engine.stats().completed, 1);
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::{
    select,
    sync::{Notify, broadcast, mpsc},
    task::{JoinHandle, JoinSet},
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        builder::EngineBuilder,
        config::EngineConfig,
        dispatcher::{DispatchOutcome, Dispatcher},
        drain,
        guard::TimeoutGuard,
        lane::{JobQueue, LaneRuntime, LaneWorker},
        queue::PushError,
        state::{EngineState, StateCell},
        stats::{Counters, StatsSnapshot},
    },
    error::EngineError,
    events::{Bus, Event, EventKind},
    jobs::{HandlerRef, Job, JobId},
    subscribers::{Subscribe, SubscriberSet},
};

/// Number of jobs currently buffered in each queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueDepths {
    /// Jobs waiting in the intake queue.
    pub intake: usize,
    /// Jobs waiting in each lane queue, by lane index.
    pub lanes: Vec<usize>,
}

impl QueueDepths {
    /// Sum of every queue.
    pub fn total(&self) -> usize {
        self.intake + self.lanes.iter().sum::<usize>()
    }
}

/// Bounded-concurrency job engine.
///
/// Build it with [`Engine::builder`]; drive it with [`submit`](Self::submit),
/// [`start`](Self::start) and [`stop`](Self::stop).
pub struct Engine {
    cfg: EngineConfig,
    guard: TimeoutGuard,
    intake: Arc<JobQueue>,
    lanes: Vec<Arc<JobQueue>>,
    space: Arc<Notify>,
    shutdown: CancellationToken,
    state: StateCell,
    started: AtomicBool,
    next_id: AtomicU64,
    counters: Arc<Counters>,
    bus: Bus,
    subscribers: Mutex<Vec<Arc<dyn Subscribe>>>,
    listener_rx: Mutex<Option<mpsc::UnboundedReceiver<Event>>>,
}

impl Engine {
    /// Returns a builder for an engine running `handler` under `cfg`.
    pub fn builder(cfg: EngineConfig, handler: HandlerRef) -> EngineBuilder {
        EngineBuilder::new(cfg, handler)
    }

    pub(crate) fn new_internal(
        cfg: EngineConfig,
        handler: HandlerRef,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        // Tapped now so events published before `start` are not lost.
        let (bus, listener_rx) = if subscribers.is_empty() {
            (Bus::new(cfg.bus_capacity_clamped()), None)
        } else {
            let (tap, rx) = mpsc::unbounded_channel();
            (Bus::with_tap(cfg.bus_capacity_clamped(), tap), Some(rx))
        };
        let space = Arc::new(Notify::new());
        let lanes = cfg
            .lane_capacities()
            .into_iter()
            .map(|cap| Arc::new(JobQueue::with_space_signal(cap, Arc::clone(&space))))
            .collect();

        Self {
            guard: TimeoutGuard::new(handler, cfg.job_timeout()),
            intake: Arc::new(JobQueue::new(cfg.intake_capacity)),
            lanes,
            space,
            shutdown: CancellationToken::new(),
            state: StateCell::new(),
            started: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            counters: Arc::new(Counters::default()),
            bus,
            subscribers: Mutex::new(subscribers),
            listener_rx: Mutex::new(listener_rx),
            cfg,
        }
    }

    /// Submits one job.
    ///
    /// Returns as soon as the job is in the intake queue. While the intake is
    /// full the caller is held, retrying every
    /// [`submit_backoff`](EngineConfig::submit_backoff), until space frees or
    /// shutdown is requested.
    ///
    /// # Errors
    /// [`EngineError::AlreadyClosed`] if shutdown was requested before the job
    /// was accepted. The job is not enqueued.
    pub async fn submit(
        &self,
        ctx: CancellationToken,
        payload: impl Into<String>,
    ) -> Result<JobId, EngineError> {
        let backoff = self.cfg.submit_backoff();
        let mut job = self.new_job(ctx, payload);
        let id = job.id();

        loop {
            if self.shutdown.is_cancelled() {
                return Err(EngineError::AlreadyClosed);
            }
            match self.intake.try_push(job) {
                Ok(()) => return Ok(self.accepted(id)),
                Err(PushError::Closed(_)) => return Err(EngineError::AlreadyClosed),
                Err(PushError::Full(back)) => job = back,
            }

            select! {
                biased;
                _ = self.shutdown.cancelled() => return Err(EngineError::AlreadyClosed),
                _ = time::sleep(backoff) => {}
            }
        }
    }

    /// Single non-blocking submission attempt.
    ///
    /// # Errors
    /// - [`EngineError::AlreadyClosed`] after shutdown was requested;
    /// - [`EngineError::IntakeFull`] if the intake queue is at capacity.
    pub fn try_submit(
        &self,
        ctx: CancellationToken,
        payload: impl Into<String>,
    ) -> Result<JobId, EngineError> {
        if self.shutdown.is_cancelled() {
            return Err(EngineError::AlreadyClosed);
        }
        let job = self.new_job(ctx, payload);
        let id = job.id();
        match self.intake.try_push(job) {
            Ok(()) => Ok(self.accepted(id)),
            Err(PushError::Closed(_)) => Err(EngineError::AlreadyClosed),
            Err(PushError::Full(_)) => Err(EngineError::IntakeFull),
        }
    }

    /// Runs the engine until it is terminal.
    ///
    /// Spawns the lane workers, runs the dispatcher, and once [`stop`](Self::stop)
    /// has been called waits for all of them, drains every leftover job and
    /// flushes event delivery. If `stop` was called before `start`, steady state
    /// is skipped and only the drain runs.
    ///
    /// # Errors
    /// [`EngineError::AlreadyStarted`] on every call after the first.
    pub async fn start(&self) -> Result<(), EngineError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(EngineError::AlreadyStarted);
        }
        let listener = self.spawn_listener();

        let outcome = if self.state.begin_running() {
            self.bus
                .publish(Event::new(EventKind::EngineStarted).with_pending(self.lanes.len()));
            self.run_steady().await
        } else {
            DispatchOutcome::default()
        };
        self.drain(outcome).await;

        self.state.terminate();
        self.bus.publish(Event::new(EventKind::EngineTerminated));
        if let Some(handle) = listener {
            let _ = handle.await;
        }
        Ok(())
    }

    /// Requests shutdown. Never blocks.
    ///
    /// Returns `true` only for the call that fired the shutdown signal; later
    /// calls (and calls after the engine is terminal) are no-ops returning `false`.
    pub fn stop(&self) -> bool {
        if !self.state.begin_shutdown() {
            return false;
        }
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.shutdown.cancel();
        true
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state.get()
    }

    /// Snapshot of the per-outcome counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.counters.snapshot()
    }

    /// Snapshot of how many jobs each queue currently holds.
    pub fn depths(&self) -> QueueDepths {
        QueueDepths {
            intake: self.intake.len(),
            lanes: self.lanes.iter().map(|q| q.len()).collect(),
        }
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Capacity of every lane queue, by lane index.
    pub fn lane_capacities(&self) -> Vec<usize> {
        self.lanes.iter().map(|q| q.capacity()).collect()
    }

    /// Subscribes directly to the event bus.
    ///
    /// Receivers read a bounded ring and may lag and drop events; use a
    /// [`Subscribe`] implementation for complete delivery.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    fn new_job(&self, ctx: CancellationToken, payload: impl Into<String>) -> Job {
        let id = JobId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        Job::new(id, ctx, payload)
    }

    fn accepted(&self, id: JobId) -> JobId {
        self.counters.record_submitted();
        id
    }

    fn lane_runtime(&self) -> LaneRuntime {
        LaneRuntime {
            guard: self.guard.clone(),
            bus: self.bus.clone(),
            counters: Arc::clone(&self.counters),
        }
    }

    /// Runs the dispatcher and every lane worker until shutdown.
    async fn run_steady(&self) -> DispatchOutcome {
        let rt = self.lane_runtime();
        let mut set = JoinSet::new();
        for (id, queue) in self.lanes.iter().enumerate() {
            let worker = LaneWorker::new(id, rt.clone());
            set.spawn(worker.run(Arc::clone(queue), self.shutdown.clone()));
        }

        let dispatcher = Dispatcher::new(
            Arc::clone(&self.intake),
            self.lanes.clone(),
            Arc::clone(&self.space),
            self.bus.clone(),
            Arc::clone(&self.counters),
        );
        let outcome = dispatcher.run(self.shutdown.clone()).await;

        while set.join_next().await.is_some() {}
        outcome
    }

    /// Flushes every leftover job: lane contents, overflow list, intake backlog.
    async fn drain(&self, outcome: DispatchOutcome) {
        let intake = self.intake.close_and_take();
        let lanes: Vec<VecDeque<Job>> = self.lanes.iter().map(|q| q.close_and_take()).collect();

        let pending = intake.len()
            + outcome.overflow.len()
            + lanes.iter().map(VecDeque::len).sum::<usize>();
        self.bus
            .publish(Event::new(EventKind::DrainStarted).with_pending(pending));

        let backlogs = drain::plan(lanes, outcome.overflow, intake, outcome.next);
        let handled = drain::run(backlogs, self.lane_runtime()).await;

        self.bus
            .publish(Event::new(EventKind::DrainCompleted).with_pending(handled));
    }

    /// Forwards tapped events to the subscriber set until `EngineTerminated`,
    /// then waits for every subscriber queue to empty.
    ///
    /// A full subscriber queue holds the listener, never a publisher.
    fn spawn_listener(&self) -> Option<JoinHandle<()>> {
        let mut rx = self
            .listener_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        let subs = std::mem::take(
            &mut *self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let set = SubscriberSet::new(subs);

        Some(tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                let last = ev.kind == EventKind::EngineTerminated;
                set.deliver(ev).await;
                if last {
                    break;
                }
            }
            set.shutdown().await;
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::HandlerFn;
    use std::time::Duration;

    fn engine(cfg: EngineConfig) -> Engine {
        let handler = HandlerFn::arc(|_ctx: CancellationToken, _p: String| async { Ok(()) });
        Engine::new_internal(cfg, handler, Vec::new())
    }

    #[test]
    fn test_lane_queues_follow_config() {
        let mut cfg = EngineConfig::with_capacity(10);
        cfg.lanes = 3;
        let e = engine(cfg);
        assert_eq!(e.lane_capacities(), vec![3, 3, 4]);
        assert_eq!(e.state(), EngineState::Created);
    }

    #[tokio::test]
    async fn test_ids_are_monotonic() {
        let e = engine(EngineConfig::with_capacity(4));
        let a = e.try_submit(CancellationToken::new(), "a").unwrap();
        let b = e.try_submit(CancellationToken::new(), "b").unwrap();
        assert!(b > a);
        assert_eq!(e.stats().submitted, 2);
        assert_eq!(e.depths().total(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_retries_until_space() {
        let mut cfg = EngineConfig::with_capacity(1);
        cfg.submit_backoff = Duration::from_millis(100);
        let e = Arc::new(engine(cfg));
        e.try_submit(CancellationToken::new(), "first").unwrap();

        let waiter = {
            let e = Arc::clone(&e);
            tokio::spawn(async move { e.submit(CancellationToken::new(), "second").await })
        };
        time::sleep(Duration::from_millis(250)).await;
        assert!(!waiter.is_finished());

        assert!(e.intake.try_pop().is_some());
        let res = waiter.await.unwrap();
        assert!(res.is_ok());
        assert_eq!(e.depths().intake, 1);
    }

    #[tokio::test]
    async fn test_try_submit_reports_full_and_closed() {
        let e = engine(EngineConfig::with_capacity(1));
        e.try_submit(CancellationToken::new(), "a").unwrap();
        assert_eq!(
            e.try_submit(CancellationToken::new(), "b"),
            Err(EngineError::IntakeFull)
        );
        assert!(e.stop());
        assert_eq!(
            e.try_submit(CancellationToken::new(), "c"),
            Err(EngineError::AlreadyClosed)
        );
        assert_eq!(e.stats().submitted, 1);
    }

    #[tokio::test]
    async fn test_drain_closes_intake() {
        let e = engine(EngineConfig::with_capacity(2));
        e.try_submit(CancellationToken::new(), "a").unwrap();
        e.stop();
        e.start().await.unwrap();

        assert!(e.intake.is_closed());
        assert!(e.lanes.iter().all(|q| q.is_closed()));
        assert_eq!(e.state(), EngineState::Terminated);
        assert_eq!(e.stats().drained, 1);
    }
}
