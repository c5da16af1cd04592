//! # Drain: bounded flush of every leftover job after shutdown.
//!
//! Runs once, after the dispatcher and every lane worker have exited. Leftovers
//! are routed back into per-lane backlogs and executed by one drain worker per
//! lane, so drain concurrency never exceeds the lane count.
//!
//! ```text
//! lane[i] queue ───────────────────────────► backlog[i]  (kept in FIFO order)
//! overflow list ─┐
//! intake queue ──┴─ round-robin from `next` ─► appended to backlog[..]
//!
//! backlog[0] ─► drain worker 0 ─┐
//! backlog[1] ─► drain worker 1 ─┼─► join all ─► DrainCompleted
//! backlog[N] ─► drain worker N ─┘
//! ```
//!
//! Backlogs ignore lane capacities: drain must accept every buffered job.

use std::collections::VecDeque;

use tokio::task::JoinSet;

use crate::{
    core::lane::{LaneRuntime, LaneWorker},
    jobs::Job,
};

/// Builds per-lane drain backlogs.
///
/// `lanes[i]` keeps its order; `overflow` (older) then `intake` (newer) are
/// spread round-robin starting at lane `next`.
pub(crate) fn plan<T>(
    mut lanes: Vec<VecDeque<T>>,
    overflow: Vec<T>,
    intake: VecDeque<T>,
    next: usize,
) -> Vec<VecDeque<T>> {
    if lanes.is_empty() {
        lanes.push(VecDeque::new());
    }
    let count = lanes.len();
    let mut n = next % count;

    for item in overflow.into_iter().chain(intake) {
        lanes[n].push_back(item);
        n = (n + 1) % count;
    }
    lanes
}

/// Executes every backlog, one worker per non-empty lane. Returns jobs handled.
pub(crate) async fn run(backlogs: Vec<VecDeque<Job>>, rt: LaneRuntime) -> usize {
    let mut set = JoinSet::new();
    for (lane, backlog) in backlogs.into_iter().enumerate() {
        if backlog.is_empty() {
            continue;
        }
        let worker = LaneWorker::new(lane, rt.clone());
        set.spawn(worker.drain(backlog));
    }
    join_workers(set).await
}

/// Sums what each drain worker handled. A worker that failed is logged and counts as zero.
async fn join_workers(mut set: JoinSet<usize>) -> usize {
    let mut handled = 0;
    while let Some(res) = set.join_next().await {
        match res {
            Ok(n) => handled += n,
            Err(err) => tracing::warn!(error = %err, "drain worker failed"),
        }
    }
    handled
}
