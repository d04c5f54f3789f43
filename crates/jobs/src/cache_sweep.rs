use janus_dns_application::ports::RecordCache;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Minute sweeper dropping cache keys whose every record has expired.
pub struct CacheSweepJob {
    cache: Arc<dyn RecordCache>,
    interval: Duration,
    cancel: CancellationToken,
}

impl CacheSweepJob {
    pub fn new(cache: Arc<dyn RecordCache>) -> Self {
        Self {
            cache,
            interval: SWEEP_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(interval_secs = self.interval.as_secs(), "Cache sweep job started");

        let mut interval = tokio::time::interval(self.interval);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => self.cache.sweep().await,
                _ = self.cancel.cancelled() => {
                    info!("Cache sweep job stopped");
                    return;
                }
            }
        }
    }
}
