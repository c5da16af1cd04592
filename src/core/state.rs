//! # Engine lifecycle state machine.
//!
//! ```text
//! Created ──start──► Running ──stop──► ShuttingDown ──drain done──► Terminated
//!    └──────────────────stop──────────────┘
//! ```
//!
//! Transitions are compare-and-swap on one atomic; a second `stop` loses the
//! race and becomes a no-op instead of re-firing the shutdown signal.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    /// Configured, `start` not yet called.
    Created = 0,
    /// Dispatcher and lane workers are active.
    Running = 1,
    /// Shutdown signal fired; loops exiting or drain in progress.
    ShuttingDown = 2,
    /// Drain complete, lane queues closed.
    Terminated = 3,
}

impl EngineState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => EngineState::Created,
            1 => EngineState::Running,
            2 => EngineState::ShuttingDown,
            _ => EngineState::Terminated,
        }
    }
}

#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(EngineState::Created as u8))
    }

    pub(crate) fn get(&self) -> EngineState {
        EngineState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// `Created → Running`. Fails if shutdown was already requested.
    pub(crate) fn begin_running(&self) -> bool {
        self.transition(EngineState::Created, EngineState::Running)
    }

    /// `Created | Running → ShuttingDown`. Only the winning caller gets `true`.
    ///
    /// One atomic update covers both source states, so a concurrent
    /// `begin_running` cannot slip between two checks.
    pub(crate) fn begin_shutdown(&self) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                matches!(
                    EngineState::from_u8(raw),
                    EngineState::Created | EngineState::Running
                )
                .then_some(EngineState::ShuttingDown as u8)
            })
            .is_ok()
    }

    pub(crate) fn terminate(&self) {
        self.0
            .store(EngineState::Terminated as u8, Ordering::Release);
    }

    fn transition(&self, from: EngineState, to: EngineState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let s = StateCell::new();
        assert_eq!(s.get(), EngineState::Created);
        assert!(s.begin_running());
        assert!(s.begin_shutdown());
        assert_eq!(s.get(), EngineState::ShuttingDown);
        s.terminate();
        assert_eq!(s.get(), EngineState::Terminated);
    }

    #[test]
    fn test_second_shutdown_is_noop() {
        let s = StateCell::new();
        s.begin_running();
        assert!(s.begin_shutdown());
        assert!(!s.begin_shutdown());
        assert_eq!(s.get(), EngineState::ShuttingDown);
    }

    #[test]
    fn test_shutdown_before_start() {
        let s = StateCell::new();
        assert!(s.begin_shutdown());
        assert!(!s.begin_running());
        assert_eq!(s.get(), EngineState::ShuttingDown);
    }

    #[test]
    fn test_shutdown_racing_start_always_wins_once() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        for _ in 0..2_000 {
            let s = Arc::new(StateCell::new());
            let barrier = Arc::new(Barrier::new(2));

            let runner = {
                let (s, barrier) = (Arc::clone(&s), Arc::clone(&barrier));
                thread::spawn(move || {
                    barrier.wait();
                    s.begin_running()
                })
            };
            let stopper = {
                let (s, barrier) = (Arc::clone(&s), Arc::clone(&barrier));
                thread::spawn(move || {
                    barrier.wait();
                    s.begin_shutdown()
                })
            };

            runner.join().unwrap();
            assert!(stopper.join().unwrap(), "stop lost against start");
            assert_eq!(s.get(), EngineState::ShuttingDown);
            assert!(!s.begin_shutdown());
        }
    }

    #[test]
    fn test_shutdown_after_terminated_is_noop() {
        let s = StateCell::new();
        s.terminate();
        assert!(!s.begin_shutdown());
    }
}
