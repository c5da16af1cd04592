//! # Dispatcher: moves jobs from the intake queue into lane queues.
//!
//! One long-lived loop. For every intake job it runs the assignment scan:
//!
//! ```text
//! n = next
//! repeat:
//!   ├─ shutdown observed?   → job goes to the overflow list, next unchanged
//!   ├─ lane[n] has room?    → push, next = n + 1, done
//!   ├─ lane[n] full         → n = (n + 1) mod lanes
//!   └─ every lane full      → wait for `space` (any lane pop) or shutdown
//! ```
//!
//! ## Rules
//! - The loop exits as soon as shutdown fires; intake backlog stays for drain.
//! - A job is in at most one place at a time: the dispatcher's hands, exactly
//!   one lane queue, or the overflow list.
//! - Zero-capacity lanes are always full and therefore always skipped.
//! - No spinning: a fully saturated scan parks on the shared space signal.

use std::sync::Arc;

use tokio::{select, sync::Notify};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{lane::JobQueue, stats::Counters},
    events::{Bus, Event, EventKind},
    jobs::Job,
};

/// What the dispatcher hands back to the shutdown coordinator.
#[derive(Debug, Default)]
pub(crate) struct DispatchOutcome {
    /// Starting position the next scan would have used.
    pub next: usize,
    /// Jobs that could not be placed before shutdown was observed.
    pub overflow: Vec<Job>,
}

pub(crate) struct Dispatcher {
    intake: Arc<JobQueue>,
    lanes: Vec<Arc<JobQueue>>,
    space: Arc<Notify>,
    bus: Bus,
    counters: Arc<Counters>,
    next: usize,
    overflow: Vec<Job>,
}

impl Dispatcher {
    /// `space` must be the signal shared by every queue in `lanes`.
    pub(crate) fn new(
        intake: Arc<JobQueue>,
        lanes: Vec<Arc<JobQueue>>,
        space: Arc<Notify>,
        bus: Bus,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            intake,
            lanes,
            space,
            bus,
            counters,
            next: 0,
            overflow: Vec::new(),
        }
    }

    /// Runs until the shutdown signal fires.
    pub(crate) async fn run(mut self, shutdown: CancellationToken) -> DispatchOutcome {
        loop {
            let next = select! {
                biased;
                _ = shutdown.cancelled() => break,
                job = self.intake.pop() => job,
            };
            let Some(job) = next else { break };

            if let Err(job) = self.assign(job, &shutdown).await {
                self.park(job);
            }
        }

        self.bus.publish(
            Event::new(EventKind::DispatcherStopped).with_pending(self.intake.len()),
        );
        DispatchOutcome {
            next: self.next,
            overflow: self.overflow,
        }
    }

    /// Round-robin-with-overflow scan. Returns the chosen lane, or the job
    /// back if shutdown was observed first.
    async fn assign(&mut self, mut job: Job, shutdown: &CancellationToken) -> Result<usize, Job> {
        let lanes = self.lanes.len();
        let start = self.next;
        let id = job.id();

        if lanes == 0 {
            return Err(job);
        }

        loop {
            for _ in 0..lanes {
                if shutdown.is_cancelled() {
                    self.next = start;
                    return Err(job);
                }
                let n = self.next % lanes;
                self.next = (n + 1) % lanes;

                match self.lanes[n].try_push(job) {
                    Ok(()) => {
                        self.bus.publish(
                            Event::new(EventKind::JobAssigned).with_lane(n).with_job(id),
                        );
                        return Ok(n);
                    }
                    Err(rejected) => job = rejected.into_inner(),
                }
            }

            select! {
                biased;
                _ = shutdown.cancelled() => {
                    self.next = start;
                    return Err(job);
                }
                _ = self.space.notified() => {}
            }
        }
    }

    fn park(&mut self, job: Job) {
        self.bus
            .publish(Event::new(EventKind::JobOverflowed).with_job(job.id()));
        self.counters.record_overflowed();
        self.overflow.push(job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobId;
    use std::time::Duration;
    use tokio::sync::broadcast;

    struct Fixture {
        intake: Arc<JobQueue>,
        lanes: Vec<Arc<JobQueue>>,
        space: Arc<Notify>,
        bus: Bus,
        counters: Arc<Counters>,
    }

    impl Fixture {
        fn new(intake: usize, caps: &[usize]) -> Self {
            let space = Arc::new(Notify::new());
            Self {
                intake: Arc::new(JobQueue::new(intake)),
                lanes: caps
                    .iter()
                    .map(|c| Arc::new(JobQueue::with_space_signal(*c, Arc::clone(&space))))
                    .collect(),
                space,
                bus: Bus::new(256),
                counters: Arc::new(Counters::default()),
            }
        }

        fn dispatcher(&self) -> Dispatcher {
            Dispatcher::new(
                Arc::clone(&self.intake),
                self.lanes.clone(),
                Arc::clone(&self.space),
                self.bus.clone(),
                Arc::clone(&self.counters),
            )
        }
    }

    fn job(n: u64) -> Job {
        Job::new(JobId::new(n), CancellationToken::new(), format!("p{n}"))
    }

    fn assigned_lanes(rx: &mut broadcast::Receiver<Event>) -> Vec<usize> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::JobAssigned {
                out.push(ev.lane.unwrap());
            }
        }
        out
    }

    #[tokio::test]
    async fn test_round_robin_with_empty_lanes() {
        let fx = Fixture::new(30, &[10, 10, 10]);
        let mut rx = fx.bus.subscribe();
        let mut d = fx.dispatcher();
        let shutdown = CancellationToken::new();

        for n in 0..9 {
            d.assign(job(n), &shutdown).await.unwrap();
        }

        assert_eq!(assigned_lanes(&mut rx), vec![0, 1, 2, 0, 1, 2, 0, 1, 2]);
        assert_eq!(
            fx.lanes.iter().map(|l| l.len()).collect::<Vec<_>>(),
            vec![3, 3, 3]
        );
    }

    #[tokio::test]
    async fn test_full_lane_is_skipped() {
        let fx = Fixture::new(4, &[1, 1, 2]);
        let mut rx = fx.bus.subscribe();
        let mut d = fx.dispatcher();
        let shutdown = CancellationToken::new();
        fx.lanes[1].try_push(job(100)).unwrap();

        for n in 0..3 {
            assert!(d.assign(job(n), &shutdown).await.is_ok());
        }

        // lane 1 is full, so the second job skips to lane 2 and the scan wraps.
        assert_eq!(assigned_lanes(&mut rx), vec![0, 2, 2]);
        assert_eq!(d.next, 0);
    }

    #[tokio::test]
    async fn test_zero_capacity_lanes_are_never_chosen() {
        let fx = Fixture::new(2, &[0, 0, 2]);
        let mut rx = fx.bus.subscribe();
        let mut d = fx.dispatcher();
        let shutdown = CancellationToken::new();

        d.assign(job(1), &shutdown).await.unwrap();
        d.assign(job(2), &shutdown).await.unwrap();

        assert_eq!(assigned_lanes(&mut rx), vec![2, 2]);
    }

    #[tokio::test]
    async fn test_saturated_scan_waits_for_space() {
        let fx = Fixture::new(2, &[1]);
        let mut d = fx.dispatcher();
        let shutdown = CancellationToken::new();
        fx.lanes[0].try_push(job(1)).unwrap();

        let lane = Arc::clone(&fx.lanes[0]);
        let consumer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            lane.try_pop().map(|j| j.id())
        });

        let placed = tokio::time::timeout(Duration::from_secs(2), d.assign(job(2), &shutdown))
            .await
            .expect("scan must wake once the lane frees a slot");
        assert_eq!(placed.ok(), Some(0));
        assert_eq!(consumer.await.unwrap(), Some(JobId::new(1)));
        assert_eq!(fx.lanes[0].try_pop().map(|j| j.id()), Some(JobId::new(2)));
    }

    #[tokio::test]
    async fn test_shutdown_mid_scan_parks_job_in_overflow() {
        let fx = Fixture::new(1, &[1]);
        fx.lanes[0].try_push(job(1)).unwrap();
        let shutdown = CancellationToken::new();
        let mut rx = fx.bus.subscribe();

        let handle = tokio::spawn(fx.dispatcher().run(shutdown.clone()));
        fx.intake.try_push(job(2)).unwrap();

        while fx.intake.len() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown.cancel();
        let outcome = handle.await.unwrap();

        let parked: Vec<_> = outcome.overflow.iter().map(Job::id).collect();
        assert_eq!(parked, vec![JobId::new(2)]);
        assert_eq!(fx.lanes[0].len(), 1);
        assert_eq!(fx.counters.snapshot().overflowed, 1);

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(
            kinds,
            vec![EventKind::JobOverflowed, EventKind::DispatcherStopped]
        );
    }

    #[tokio::test]
    async fn test_exit_leaves_intake_backlog_alone() {
        let fx = Fixture::new(3, &[3]);
        fx.intake.try_push(job(1)).unwrap();
        fx.intake.try_push(job(2)).unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let outcome = fx.dispatcher().run(shutdown).await;

        assert!(outcome.overflow.is_empty());
        assert_eq!(fx.intake.len(), 2);
        assert_eq!(fx.lanes[0].len(), 0);
    }
}
