use crate::{CacheSweepJob, CategoryRefreshJob, GeoDbRefreshJob};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub trait SpawnableJob: Send + 'static {
    fn with_cancellation(self, token: CancellationToken) -> Self;
    fn start_job(self: Arc<Self>) -> tokio::task::JoinHandle<()>;
}

macro_rules! impl_spawnable_job {
    ($t:ty) => {
        impl SpawnableJob for $t {
            fn with_cancellation(self, token: CancellationToken) -> Self {
                self.with_cancellation(token)
            }

            fn start_job(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
                tokio::spawn(async move { self.start().await })
            }
        }
    };
}

impl_spawnable_job!(CategoryRefreshJob);
impl_spawnable_job!(GeoDbRefreshJob);
impl_spawnable_job!(CacheSweepJob);

fn spawn_job<J: SpawnableJob>(job: Option<J>, shutdown: &Option<CancellationToken>) {
    if let Some(job) = job {
        let job = match shutdown {
            Some(token) => job.with_cancellation(token.clone()),
            None => job,
        };
        Arc::new(job).start_job();
    }
}

/// Collects the optional background jobs and spawns whichever were
/// configured, each watching the shared shutdown token.
pub struct JobRunner {
    category_refresh: Option<CategoryRefreshJob>,
    geodb_refresh: Option<GeoDbRefreshJob>,
    cache_sweep: Option<CacheSweepJob>,
    shutdown: Option<CancellationToken>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            category_refresh: None,
            geodb_refresh: None,
            cache_sweep: None,
            shutdown: None,
        }
    }

    pub fn with_category_refresh(mut self, job: CategoryRefreshJob) -> Self {
        self.category_refresh = Some(job);
        self
    }

    pub fn with_geodb_refresh(mut self, job: GeoDbRefreshJob) -> Self {
        self.geodb_refresh = Some(job);
        self
    }

    pub fn with_cache_sweep(mut self, job: CacheSweepJob) -> Self {
        self.cache_sweep = Some(job);
        self
    }

    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    pub async fn start(self) {
        info!("Starting background job runner");

        spawn_job(self.category_refresh, &self.shutdown);
        spawn_job(self.geodb_refresh, &self.shutdown);
        spawn_job(self.cache_sweep, &self.shutdown);

        info!("All background jobs started");
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}
