//! Engine core: queues, dispatch, execution and shutdown.
//!
//! The only public API from this module is [`Engine`] (built with
//! [`EngineBuilder`]) plus its configuration and snapshot types.
//!
//! Internal modules:
//! - [`queue`]: bounded FIFO backing the intake and every lane;
//! - [`guard`]: runs one handler invocation under a deadline;
//! - [`lane`]: per-lane worker loop with the panic boundary;
//! - [`dispatcher`]: round-robin-with-overflow assignment into lanes;
//! - [`drain`]: routes leftovers into per-lane backlogs after shutdown;
//! - [`state`]: lifecycle state machine;
//! - [`stats`]: per-outcome counters;
//! - [`engine`]: the Submit / Start / Stop facade.

mod builder;
mod config;
mod dispatcher;
mod drain;
mod engine;
mod guard;
mod lane;
mod queue;
mod state;
mod stats;

pub use builder::EngineBuilder;
pub use config::EngineConfig;
pub use engine::{Engine, QueueDepths};
pub use state::EngineState;
pub use stats::StatsSnapshot;
