use std::sync::Arc;

use crate::{
    core::{config::EngineConfig, engine::Engine},
    jobs::HandlerRef,
    subscribers::Subscribe,
};

/// Builder for constructing an [`Engine`] with optional subscribers.
pub struct EngineBuilder {
    cfg: EngineConfig,
    handler: HandlerRef,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl EngineBuilder {
    /// Creates a new builder with the given configuration and handler.
    pub fn new(cfg: EngineConfig, handler: HandlerRef) -> Self {
        Self {
            cfg,
            handler,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive engine events (lifecycle, job outcomes, drain)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Appends one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the engine.
    ///
    /// Does not spawn anything; subscriber workers start with [`Engine::start`].
    pub fn build(self) -> Arc<Engine> {
        Arc::new(Engine::new_internal(self.cfg, self.handler, self.subscribers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crate::jobs::HandlerFn;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct Quiet;

    #[async_trait]
    impl Subscribe for Quiet {
        async fn on_event(&self, _ev: &Event) {}
    }

    #[test]
    fn test_build_outside_runtime() {
        let handler = HandlerFn::arc(|_ctx: CancellationToken, _p: String| async { Ok(()) });
        let mut cfg = EngineConfig::with_capacity(8);
        cfg.lanes = 4;

        let engine = EngineBuilder::new(cfg, handler)
            .with_subscriber(Arc::new(Quiet))
            .with_subscriber(Arc::new(Quiet))
            .build();

        assert_eq!(engine.config().lane_count(), 4);
        assert_eq!(engine.lane_capacities(), vec![2, 2, 2, 2]);
    }
}
