use crate::schedule::until_next_tick;
use cron::Schedule;
use janus_dns_infrastructure::dns::geoip::GeoIpMatcher;
use janus_dns_infrastructure::fetch;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cron-driven re-download of the country/ASN databases with an atomic
/// reader swap. In-flight rule evaluations keep using the old readers.
pub struct GeoDbRefreshJob {
    matcher: Arc<GeoIpMatcher>,
    schedule: Schedule,
    country_source: String,
    asn_source: String,
    work_dir: PathBuf,
    cancel: CancellationToken,
}

impl GeoDbRefreshJob {
    pub fn new(
        matcher: Arc<GeoIpMatcher>,
        schedule: Schedule,
        country_source: String,
        asn_source: String,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            matcher,
            schedule,
            country_source,
            asn_source,
            work_dir,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(schedule = %self.schedule, "GeoIP refresh job started");

        loop {
            let Some(delay) = until_next_tick(&self.schedule) else {
                info!("GeoIP refresh schedule exhausted");
                return;
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => self.refresh().await,
                _ = self.cancel.cancelled() => {
                    info!("GeoIP refresh job stopped");
                    return;
                }
            }
        }
    }

    async fn refresh(&self) {
        type LoadFn = fn(&GeoIpMatcher, &std::path::Path) -> Result<(), janus_dns_domain::DnsError>;

        for (source, file_name, load) in [
            (
                &self.country_source,
                "Country.mmdb",
                GeoIpMatcher::load_country as LoadFn,
            ),
            (&self.asn_source, "GeoLite2-ASN.mmdb", GeoIpMatcher::load_asn as LoadFn),
        ] {
            if source.is_empty() {
                continue;
            }
            let dest = self.work_dir.join(file_name);
            match fetch::ensure_file(source, &dest).await {
                Ok(path) => {
                    if let Err(e) = load(&self.matcher, &path) {
                        error!(source = %source, error = %e, "GeoIP database reload failed");
                    }
                }
                Err(e) => error!(source = %source, error = %e, "GeoIP database fetch failed"),
            }
        }
    }
}
