use anyhow::Context;
use clap::Parser;
use cron::Schedule;
use janus_dns_infrastructure::dns::category;
use janus_dns_infrastructure::fetch;
use janus_dns_jobs::{CacheSweepJob, CategoryRefreshJob, GeoDbRefreshJob, JobRunner};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod bootstrap;
mod di;
mod server;

const CATALOG_FILE: &str = "dlc.dat";
const COUNTRY_DB_FILE: &str = "Country.mmdb";
const ASN_DB_FILE: &str = "GeoLite2-ASN.mmdb";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "janus-dns")]
#[command(version)]
#[command(about = "Janus DNS - policy-routed split-horizon DNS resolver")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<String>,

    /// Runtime directory; switches cwd and picks config.yaml or config.yml
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    dir: Option<String>,

    /// Preload the category database, then exit
    #[arg(short = 'l', long = "load")]
    load: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = bootstrap::load_config(cli.config.as_deref(), cli.dir.as_deref())
        .context("configuration error")?;
    bootstrap::init_logging(&config.log);

    info!("Starting Janus DNS v{}", env!("CARGO_PKG_VERSION"));

    // External files: category catalog and the locality databases. Failures
    // degrade the affected subsystem but never abort startup.
    let catalog_path = if config.category_policy.preload.enable {
        match fetch::ensure_file(&config.category_policy.preload.file, Path::new(CATALOG_FILE)).await
        {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "Category catalog unavailable");
                None
            }
        }
    } else {
        None
    };

    let components = di::build(&config).await?;

    let country_path = fetch_database(&config.fallback.geoip, COUNTRY_DB_FILE).await;
    if let Some(path) = &country_path {
        if let Err(e) = components.matcher.load_country(path) {
            warn!(error = %e, "Country database load failed");
        }
    }
    let asn_path = fetch_database(&config.fallback.asn, ASN_DB_FILE).await;
    if let Some(path) = &asn_path {
        if let Err(e) = components.matcher.load_asn(path) {
            warn!(error = %e, "ASN database load failed");
        }
    }

    if let Some(path) = &catalog_path {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("cannot read category catalog {:?}", path))?;
        match category::preload(
            components.categories.as_ref(),
            &bytes,
            &config.category_policy.preload.domain_group,
        )
        .await
        {
            Ok(count) => info!(entries = count, "Categories preloaded"),
            Err(e) => {
                if cli.load {
                    anyhow::bail!("category preload failed: {}", e);
                }
                warn!(error = %e, "Category preload failed");
            }
        }
    }

    if cli.load {
        info!("Preload finished, exiting (--load)");
        return Ok(());
    }

    // Background jobs share one shutdown token with the server.
    let shutdown = CancellationToken::new();
    let mut jobs = JobRunner::new().with_shutdown_token(shutdown.clone());

    if config.cache.dns_cache.enable {
        jobs = jobs.with_cache_sweep(CacheSweepJob::new(components.cache.clone()));
    }
    if config.category_policy.preload.enable && !config.category_policy.preload.update.is_empty() {
        let schedule = Schedule::from_str(&config.category_policy.preload.update)
            .context("invalid preload cron")?;
        jobs = jobs.with_category_refresh(CategoryRefreshJob::new(
            components.categories.clone(),
            schedule,
            config.category_policy.preload.file.clone(),
            PathBuf::from(CATALOG_FILE),
            config.category_policy.preload.domain_group.clone(),
        ));
    }
    if !config.fallback.update.is_empty() {
        let schedule =
            Schedule::from_str(&config.fallback.update).context("invalid fallback cron")?;
        jobs = jobs.with_geodb_refresh(GeoDbRefreshJob::new(
            components.matcher.clone(),
            schedule,
            config.fallback.geoip.clone(),
            config.fallback.asn.clone(),
            PathBuf::from("."),
        ));
    }
    jobs.start().await;

    let bind_addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .context("invalid server bind address")?;
    // Fail fast when the port is already taken; the workers rebind with
    // SO_REUSEPORT right after.
    std::net::UdpSocket::bind(bind_addr)
        .with_context(|| format!("cannot bind DNS port {}", bind_addr))?;
    let udp_server = server::UdpServer::new(bind_addr, components.router.clone(), shutdown.clone());

    let server_task = tokio::spawn(async move {
        if let Err(e) = udp_server.run().await {
            error!(error = %e, "DNS server error");
        }
    });

    wait_for_signal().await;
    info!("Shutdown signal received, draining");

    // Stop accepting datagrams, give in-flight queries a bounded grace
    // period, then exit.
    shutdown.cancel();
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, server_task).await;

    info!("Shutdown complete");
    Ok(())
}

async fn fetch_database(source: &str, file_name: &str) -> Option<PathBuf> {
    if source.is_empty() {
        return None;
    }
    match fetch::ensure_file(source, Path::new(file_name)).await {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(source = %source, error = %e, "Locality database unavailable");
            None
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate()).expect("SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
