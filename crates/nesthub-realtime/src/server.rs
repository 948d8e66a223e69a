//! Top-level realtime engine: wiring and lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use nesthub_auth::jwt::JwtDecoder;
use nesthub_core::config::AppConfig;
use nesthub_database::MarketStore;

use crate::audit::alerts::{AlertSink, TracingAlertSink};
use crate::audit::log::SecurityAuditLog;
use crate::connection::authenticator::WsAuthenticator;
use crate::gateway::ChatGateway;
use crate::ratelimit::limiter::RateLimiter;

/// Assembled realtime subsystem, shared across connection handlers.
pub struct RealtimeEngine {
    gateway: Arc<ChatGateway>,
    authenticator: WsAuthenticator,
    limiter: Arc<RateLimiter>,
    audit: Arc<SecurityAuditLog>,
    channel_buffer_size: usize,
    sweep_interval: Duration,
    shutdown_tx: watch::Sender<bool>,
}

impl RealtimeEngine {
    /// Wire the engine from configuration, with alerts going to the
    /// tracing sink.
    pub fn new(config: &AppConfig, store: Arc<dyn MarketStore>, decoder: Arc<JwtDecoder>) -> Self {
        Self::with_alert_sink(config, store, decoder, Arc::new(TracingAlertSink))
    }

    /// Wire the engine with a custom alert sink.
    pub fn with_alert_sink(
        config: &AppConfig,
        store: Arc<dyn MarketStore>,
        decoder: Arc<JwtDecoder>,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let audit = Arc::new(SecurityAuditLog::new(&config.gateway, sink));
        let gateway = Arc::new(ChatGateway::new(
            store.clone(),
            limiter.clone(),
            audit.clone(),
        ));
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            gateway,
            authenticator: WsAuthenticator::new(decoder, store),
            limiter,
            audit,
            channel_buffer_size: config.gateway.channel_buffer_size,
            sweep_interval: Duration::from_secs(config.rate_limit.sweep_interval_seconds),
            shutdown_tx,
        }
    }

    pub fn gateway(&self) -> &Arc<ChatGateway> {
        &self.gateway
    }

    pub fn authenticator(&self) -> &WsAuthenticator {
        &self.authenticator
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn audit(&self) -> &Arc<SecurityAuditLog> {
        &self.audit
    }

    /// Per-connection outbound buffer size.
    pub fn channel_buffer_size(&self) -> usize {
        self.channel_buffer_size
    }

    /// Start the periodic limiter garbage-collection sweep.
    ///
    /// The task runs until [`Self::shutdown`] is called.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let limiter = self.limiter.clone();
        let interval = self.sweep_interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        limiter.sweep();
                        debug!(tracked_users = limiter.tracked_users(), "Rate limiter sweep complete");
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Rate limiter sweeper stopped");
        })
    }

    /// Stop background tasks and close every live connection.
    pub fn shutdown(&self) {
        info!("Shutting down realtime engine");
        let _ = self.shutdown_tx.send(true);
        self.gateway.close_all();
    }
}
