//! # Engine configuration.
//!
//! Provides [`EngineConfig`], the settings fixed at construction time.
//!
//! ## Sentinel values
//! - `lanes = 0` → 3 lanes
//! - `timeout = 0s` → 10 minutes
//! - `submit_backoff = 0s` → 1 second
//! - `bus_capacity = 0` → 1 (clamped)
//!
//! `intake_capacity = 0` is legal: every lane gets zero capacity and `submit`
//! holds its caller until shutdown, then returns `AlreadyClosed`.

use std::time::Duration;

const DEFAULT_LANES: usize = 3;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const DEFAULT_SUBMIT_BACKOFF: Duration = Duration::from_secs(1);

/// Configuration for one [`Engine`](crate::Engine).
///
/// ## Field semantics
/// - `lanes`: number of parallel execution lanes (`0` = default 3)
/// - `intake_capacity`: intake buffer size, also split across the lane queues
/// - `timeout`: per-job deadline enforced by the timeout guard (`0s` = 10 min)
/// - `submit_backoff`: polling interval while the intake is full (`0s` = 1s)
/// - `bus_capacity`: event bus ring buffer size
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Number of lanes (one worker + one bounded queue each).
    pub lanes: usize,

    /// Capacity of the intake queue.
    ///
    /// Lane queues receive `intake_capacity / lanes` slots each; the last lane
    /// additionally absorbs the remainder.
    pub intake_capacity: usize,

    /// Wall-clock deadline for one handler invocation.
    pub timeout: Duration,

    /// Fixed retry interval of `submit` while the intake queue is full.
    pub submit_backoff: Duration,

    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,
}

impl EngineConfig {
    /// Creates a config with the given intake capacity and defaults elsewhere.
    pub fn with_capacity(intake_capacity: usize) -> Self {
        Self {
            intake_capacity,
            ..Self::default()
        }
    }

    /// Returns the effective lane count.
    #[inline]
    pub fn lane_count(&self) -> usize {
        if self.lanes == 0 {
            DEFAULT_LANES
        } else {
            self.lanes
        }
    }

    /// Returns the effective per-job deadline.
    #[inline]
    pub fn job_timeout(&self) -> Duration {
        if self.timeout == Duration::ZERO {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }

    /// Returns the effective polling interval for a full intake queue.
    #[inline]
    pub fn submit_backoff(&self) -> Duration {
        if self.submit_backoff == Duration::ZERO {
            DEFAULT_SUBMIT_BACKOFF
        } else {
            self.submit_backoff
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the capacity of every lane queue, in lane order.
    ///
    /// Capacities always sum to `intake_capacity`.
    pub fn lane_capacities(&self) -> Vec<usize> {
        let lanes = self.lane_count();
        let base = self.intake_capacity / lanes;
        let rest = self.intake_capacity % lanes;

        let mut caps = vec![base; lanes];
        if let Some(last) = caps.last_mut() {
            *last += rest;
        }
        caps
    }
}

impl Default for EngineConfig {
    /// Default configuration:
    ///
    /// - `lanes = 3`
    /// - `intake_capacity = 0` (set it; see module docs)
    /// - `timeout = 10min`
    /// - `submit_backoff = 1s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            lanes: DEFAULT_LANES,
            intake_capacity: 0,
            timeout: DEFAULT_TIMEOUT,
            submit_backoff: DEFAULT_SUBMIT_BACKOFF,
            bus_capacity: 1024,
        }
    }
}
