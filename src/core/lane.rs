//! # LaneWorker: one execution lane.
//!
//! A lane is one worker plus its dedicated bounded queue. The worker:
//! - waits for either a job on its queue or the shutdown signal,
//! - runs each job through the [`TimeoutGuard`],
//! - recovers handler panics at the lane boundary,
//! - publishes one outcome event per job.
//!
//! ## Event flow
//! ```text
//! LaneStarted
//!   └─ loop ─► pop job ─► guard.call() ─► JobCompleted
//!                                      ├► TimeoutHit → JobFailed
//!                                      ├► JobFailed
//!                                      └► JobPanicked (recovered, job dropped)
//! shutdown ─► LaneStopped { pending }   (queue contents left for drain)
//! ```
//!
//! ## Rules
//! - Jobs of one lane run **sequentially** in queue order.
//! - Shutdown is checked before every wait; a job already popped runs to completion.
//! - The same `execute` path serves the drain phase, tagged [`Phase::Drain`].

use std::any::Any;
use std::backtrace::Backtrace;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{guard::TimeoutGuard, queue::BoundedQueue, stats::Counters},
    events::{Bus, Event, EventKind, Phase},
    jobs::Job,
};

/// Queue type shared by the intake and every lane.
pub(crate) type JobQueue = BoundedQueue<Job>;

/// Shared pieces every lane (steady or drain) executes with.
#[derive(Clone)]
pub(crate) struct LaneRuntime {
    pub guard: TimeoutGuard,
    pub bus: Bus,
    pub counters: Arc<Counters>,
}

/// Executes jobs for one lane index.
pub(crate) struct LaneWorker {
    id: usize,
    rt: LaneRuntime,
}

impl LaneWorker {
    pub(crate) fn new(id: usize, rt: LaneRuntime) -> Self {
        Self { id, rt }
    }

    /// Steady-state loop. Returns once the shutdown signal is observed.
    pub(crate) async fn run(self, queue: Arc<JobQueue>, shutdown: CancellationToken) {
        self.rt
            .bus
            .publish(Event::new(EventKind::LaneStarted).with_lane(self.id));

        loop {
            let next = select! {
                biased;
                _ = shutdown.cancelled() => break,
                job = queue.pop() => job,
            };
            match next {
                Some(job) => self.execute(job, Phase::Steady).await,
                None => break,
            }
        }

        self.rt.bus.publish(
            Event::new(EventKind::LaneStopped)
                .with_lane(self.id)
                .with_pending(queue.len()),
        );
    }

    /// Runs a drain backlog to completion, in order. Returns the number of jobs handled.
    pub(crate) async fn drain(self, backlog: VecDeque<Job>) -> usize {
        let mut handled = 0;
        for job in backlog {
            self.execute(job, Phase::Drain).await;
            self.rt.counters.record_drained();
            handled += 1;
        }
        handled
    }

    async fn execute(&self, job: Job, phase: Phase) {
        let (id, ctx, payload) = job.into_parts();
        let call = self.rt.guard.call(&ctx, payload);

        let base = |kind| {
            Event::new(kind)
                .with_lane(self.id)
                .with_job(id)
                .with_phase(phase)
        };

        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(res) => {
                self.rt.counters.record_outcome(&res);
                match res {
                    Ok(()) => self.rt.bus.publish(base(EventKind::JobCompleted)),
                    Err(err) => {
                        if err.is_timeout() {
                            self.rt.bus.publish(
                                base(EventKind::TimeoutHit).with_timeout(self.rt.guard.timeout()),
                            );
                        }
                        self.rt
                            .bus
                            .publish(base(EventKind::JobFailed).with_reason(err.to_string()));
                    }
                }
            }
            Err(panic) => {
                self.rt.counters.record_panicked();
                // Handler frames are gone; this is the lane's own stack.
                let trace = Backtrace::force_capture();
                self.rt.bus.publish(
                    base(EventKind::JobPanicked)
                        .with_reason(panic_message(panic.as_ref()))
                        .with_recovery_trace(trace.to_string()),
                );
            }
        }
    }
}

/// Renders a recovered panic value.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use crate::jobs::{HandlerFn, JobId};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::broadcast;

    fn runtime_with<F, Fut>(timeout: Duration, f: F) -> (LaneRuntime, broadcast::Receiver<Event>)
    where
        F: Fn(CancellationToken, String) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), JobError>> + Send + 'static,
    {
        let bus = Bus::new(256);
        let rx = bus.subscribe();
        let rt = LaneRuntime {
            guard: TimeoutGuard::new(HandlerFn::arc(f), timeout),
            bus,
            counters: Arc::new(Counters::default()),
        };
        (rt, rx)
    }

    fn job(n: u64, payload: &str) -> Job {
        Job::new(JobId::new(n), CancellationToken::new(), payload)
    }

    fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[test]
    fn test_panic_message_variants() {
        let a: Box<dyn Any + Send> = Box::new("static");
        let b: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let c: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(a.as_ref()), "static");
        assert_eq!(panic_message(b.as_ref()), "owned");
        assert_eq!(panic_message(c.as_ref()), "non-string panic payload");
    }

    #[tokio::test]
    async fn test_run_processes_in_fifo_order_and_stops() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let (rt, mut rx) = runtime_with(Duration::from_secs(5), move |_ctx, payload| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(payload);
                Ok(())
            }
        });

        let queue = Arc::new(JobQueue::new(4));
        for (i, p) in ["a", "b", "c"].iter().enumerate() {
            queue.try_push(job(i as u64, p)).unwrap();
        }

        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(LaneWorker::new(0, rt.clone()).run(Arc::clone(&queue), shutdown.clone()));

        while rt.counters.snapshot().completed < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown.cancel();
        worker.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
        let kinds: Vec<_> = drain_events(&mut rx).into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds.first(), Some(&EventKind::LaneStarted));
        assert_eq!(kinds.last(), Some(&EventKind::LaneStopped));
    }

    #[tokio::test]
    async fn test_shutdown_leaves_queue_for_drain() {
        let (rt, mut rx) = runtime_with(Duration::from_secs(5), |_ctx, _p| async { Ok(()) });
        let queue = Arc::new(JobQueue::new(2));
        queue.try_push(job(1, "left")).unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        LaneWorker::new(1, rt.clone()).run(Arc::clone(&queue), shutdown).await;

        assert_eq!(queue.len(), 1);
        assert_eq!(rt.counters.snapshot().finished(), 0);
        let stopped = drain_events(&mut rx)
            .into_iter()
            .find(|e| e.kind == EventKind::LaneStopped)
            .unwrap();
        assert_eq!(stopped.lane, Some(1));
        assert_eq!(stopped.pending, Some(1));
    }

    #[tokio::test]
    async fn test_panic_is_recovered_and_reported() {
        let (rt, mut rx) = runtime_with(Duration::from_secs(5), |_ctx, payload: String| async move {
            if payload == "boom" {
                panic!("lane test panic");
            }
            Ok(())
        });

        let handled = LaneWorker::new(2, rt.clone())
            .drain(VecDeque::from(vec![job(1, "boom"), job(2, "fine")]))
            .await;
        assert_eq!(handled, 2);

        let stats = rt.counters.snapshot();
        assert_eq!(stats.panicked, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.drained, 2);

        let events = drain_events(&mut rx);
        let completed = events
            .iter()
            .find(|e| e.kind == EventKind::JobCompleted)
            .unwrap();
        assert!(completed.recovery_trace.is_none());
        let panicked = events
            .into_iter()
            .find(|e| e.kind == EventKind::JobPanicked)
            .unwrap();
        assert_eq!(panicked.lane, Some(2));
        assert_eq!(panicked.job, Some(JobId::new(1)));
        assert_eq!(panicked.phase, Some(Phase::Drain));
        assert_eq!(panicked.reason.as_deref(), Some("lane test panic"));
        assert!(panicked.recovery_trace.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_publishes_marker_then_failure() {
        let (rt, mut rx) = runtime_with(Duration::from_secs(1), |_ctx, _p| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(())
        });

        LaneWorker::new(0, rt.clone())
            .drain(VecDeque::from(vec![job(5, "slow")]))
            .await;

        let kinds: Vec<_> = drain_events(&mut rx)
            .into_iter()
            .filter(Event::is_outcome)
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, vec![EventKind::TimeoutHit, EventKind::JobFailed]);
        assert_eq!(rt.counters.snapshot().timed_out, 1);
    }
}
