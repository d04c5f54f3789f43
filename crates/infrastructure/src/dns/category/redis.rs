use crate::dns::cache::redis::clear_prefix;
use async_trait::async_trait;
use janus_dns_application::ports::CategoryStore;
use janus_dns_domain::DnsError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

const KEY_PREFIX: &str = "category:";
/// MSET batch size for bulk loads; catalogs run to hundreds of thousands of
/// entries.
const BULK_BATCH: usize = 1000;

/// Category map on redis under `category:`-prefixed keys, shared between
/// instances and surviving restarts.
pub struct RedisCategoryStore {
    conn: ConnectionManager,
    /// Per-entry TTL in seconds; 0 = no expiry. Applies only to point
    /// writes — bulk loads are refreshed wholesale by the cron job.
    ttl: u64,
}

impl RedisCategoryStore {
    pub async fn connect(url: &str, ttl: u64) -> Result<Self, DnsError> {
        let client = redis::Client::open(url)
            .map_err(|e| DnsError::Config(format!("invalid redis url: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| DnsError::CacheBackend(format!("redis connect failed: {}", e)))?;
        Ok(Self { conn, ttl })
    }

    pub fn from_manager(conn: ConnectionManager, ttl: u64) -> Self {
        Self { conn, ttl }
    }

    fn key(domain: &str) -> String {
        format!("{}{}", KEY_PREFIX, domain)
    }
}

#[async_trait]
impl CategoryStore for RedisCategoryStore {
    async fn get(&self, domain: &str) -> Option<Arc<str>> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(Self::key(domain)).await {
            Ok(value) => value.map(|tag| Arc::from(tag.as_str())),
            Err(e) => {
                warn!(domain = %domain, error = %e, "Redis category read failed");
                None
            }
        }
    }

    async fn set(&self, domain: &str, category: &str) {
        let mut conn = self.conn.clone();
        let key = Self::key(domain);
        let result = if self.ttl > 0 {
            conn.set_ex::<_, _, ()>(&key, category, self.ttl).await
        } else {
            conn.set::<_, _, ()>(&key, category).await
        };
        if let Err(e) = result {
            warn!(domain = %domain, error = %e, "Redis category write failed");
        }
    }

    async fn bulk_set(&self, entries: HashMap<String, String>) {
        let mut conn = self.conn.clone();
        let total = entries.len();
        let mut written = 0usize;

        let pairs: Vec<(String, String)> = entries
            .into_iter()
            .map(|(domain, category)| (Self::key(&domain), category))
            .collect();

        for chunk in pairs.chunks(BULK_BATCH) {
            match conn.mset::<_, _, ()>(chunk).await {
                Ok(()) => written += chunk.len(),
                Err(e) => {
                    warn!(
                        error = %e,
                        written,
                        total,
                        "Redis bulk category write failed, aborting load"
                    );
                    return;
                }
            }
        }

        info!(entries = written, "Category map written to redis");
    }

    async fn delete(&self, domain: &str) {
        let mut conn = self.conn.clone();
        if let Err(e) = conn.del::<_, ()>(Self::key(domain)).await {
            warn!(domain = %domain, error = %e, "Redis category delete failed");
        }
    }

    async fn clear(&self) {
        if let Err(e) = clear_prefix(self.conn.clone(), "category:*").await {
            warn!(error = %e, "Redis category clear failed");
        }
    }
}
