//! Shared application state for the relay gateway.
//!
//! Owns the config, the broadcast router (registry + pending table), the
//! inbound dispatcher, metrics, and the shutdown token every long-lived task
//! derives its cancellation from.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::dispatch::CommandDispatcher;
use crate::obs::RelayMetrics;
use crate::realtime::BroadcastRouter;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: RelayConfig,
    router: BroadcastRouter,
    dispatcher: CommandDispatcher,
    metrics: Arc<RelayMetrics>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(cfg: RelayConfig) -> Self {
        let metrics = Arc::new(RelayMetrics::default());
        let router = BroadcastRouter::new(cfg.relay.router_settings(), Arc::clone(&metrics));
        let dispatcher = CommandDispatcher::new(router.clone());

        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                router,
                dispatcher,
                metrics,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn cfg(&self) -> &RelayConfig {
        &self.inner.cfg
    }

    pub fn router(&self) -> &BroadcastRouter {
        &self.inner.router
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.inner.dispatcher
    }

    pub fn metrics(&self) -> &RelayMetrics {
        &self.inner.metrics
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    /// Stop accepting peers and cancel every session and in-flight call.
    pub fn begin_drain(&self) {
        self.inner.metrics.set_draining();
        self.inner.shutdown.cancel();
    }

    /// Point-in-time values for `/metrics`.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("askrelay_registry_peers", self.router().registry().len() as u64),
            ("askrelay_pending_requests", self.router().pending().len() as u64),
        ]
    }
}
