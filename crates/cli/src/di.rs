use anyhow::Context;
use janus_dns_application::ports::{CategoryStore, RecordCache};
use janus_dns_application::QueryRouter;
use janus_dns_infrastructure::dns::cache::{MemoryRecordCache, RedisRecordCache};
use janus_dns_infrastructure::dns::category::{MemoryCategoryStore, RedisCategoryStore};
use janus_dns_infrastructure::dns::geoip::GeoIpMatcher;
use janus_dns_infrastructure::dns::upstream::UpstreamManager;
use janus_dns_domain::Config;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Components {
    pub cache: Arc<dyn RecordCache>,
    pub categories: Arc<dyn CategoryStore>,
    pub matcher: Arc<GeoIpMatcher>,
    pub router: Arc<QueryRouter>,
}

/// Wire every component from a validated config: backing stores (cleared if
/// so configured), the rule matcher, the upstream groups, and the router.
pub async fn build(config: &Config) -> anyhow::Result<Components> {
    let redis_conn = connect_redis_if_needed(config).await?;

    let cache: Arc<dyn RecordCache> = match (&redis_conn, config.cache.dns_cache.backend.as_str()) {
        (Some(conn), "redis") => Arc::new(RedisRecordCache::from_manager(conn.clone())),
        _ => Arc::new(MemoryRecordCache::new()),
    };
    if config.cache.dns_cache.clear {
        cache.clear().await;
        info!("DNS cache cleared");
    }

    let categories: Arc<dyn CategoryStore> =
        match (&redis_conn, config.cache.category_cache.backend.as_str()) {
            (Some(conn), "redis") => Arc::new(RedisCategoryStore::from_manager(
                conn.clone(),
                config.cache.category_cache.ttl,
            )),
            _ => Arc::new(MemoryCategoryStore::new()),
        };
    if config.cache.category_cache.clear {
        categories.clear().await;
        info!("Category store cleared");
    }

    let matcher = Arc::new(GeoIpMatcher::empty());

    let upstreams = Arc::new(
        UpstreamManager::from_config(config)
            .await
            .context("failed to build upstream groups")?,
    );

    let router = Arc::new(QueryRouter::new(
        cache.clone(),
        config.cache.dns_cache.enable,
        categories.clone(),
        matcher.clone(),
        upstreams,
        config.policies().context("invalid query policies")?,
        config.fallback_rules().context("invalid fallback rules")?,
    ));

    Ok(Components {
        cache,
        categories,
        matcher,
        router,
    })
}

async fn connect_redis_if_needed(config: &Config) -> anyhow::Result<Option<ConnectionManager>> {
    let needs_redis = config.cache.dns_cache.backend == "redis"
        || config.cache.category_cache.backend == "redis";
    if !needs_redis {
        return Ok(None);
    }

    let url = config.redis.url();
    let client = redis::Client::open(url.as_str()).context("invalid redis configuration")?;
    match ConnectionManager::new(client).await {
        Ok(conn) => {
            info!(server = %config.redis.server, port = config.redis.port, "Redis connected");
            Ok(Some(conn))
        }
        Err(e) => {
            warn!(error = %e, "Redis unreachable, falling back to memory backends");
            Ok(None)
        }
    }
}
