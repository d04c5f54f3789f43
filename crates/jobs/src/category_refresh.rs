use crate::schedule::until_next_tick;
use cron::Schedule;
use janus_dns_application::ports::CategoryStore;
use janus_dns_domain::config::DomainGroups;
use janus_dns_infrastructure::dns::category;
use janus_dns_infrastructure::fetch;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cron-driven re-download and re-ingestion of the category catalog.
/// The startup preload has already run; the first firing waits for the
/// schedule.
pub struct CategoryRefreshJob {
    store: Arc<dyn CategoryStore>,
    schedule: Schedule,
    source: String,
    local_path: PathBuf,
    groups: DomainGroups,
    cancel: CancellationToken,
}

impl CategoryRefreshJob {
    pub fn new(
        store: Arc<dyn CategoryStore>,
        schedule: Schedule,
        source: String,
        local_path: PathBuf,
        groups: DomainGroups,
    ) -> Self {
        Self {
            store,
            schedule,
            source,
            local_path,
            groups,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(schedule = %self.schedule, source = %self.source, "Category refresh job started");

        loop {
            let Some(delay) = until_next_tick(&self.schedule) else {
                info!("Category refresh schedule exhausted");
                return;
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = self.refresh().await {
                        error!(error = %e, "Category refresh failed");
                    }
                }
                _ = self.cancel.cancelled() => {
                    info!("Category refresh job stopped");
                    return;
                }
            }
        }
    }

    async fn refresh(&self) -> Result<(), janus_dns_domain::DnsError> {
        info!(source = %self.source, "Refreshing category catalog");
        let path = fetch::ensure_file(&self.source, &self.local_path).await?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| janus_dns_domain::DnsError::Io(format!("read {:?}: {}", path, e)))?;
        let count = category::preload(self.store.as_ref(), &bytes, &self.groups).await?;
        info!(entries = count, "Category refresh complete");
        Ok(())
    }
}
