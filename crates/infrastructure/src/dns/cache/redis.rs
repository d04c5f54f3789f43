use async_trait::async_trait;
use janus_dns_application::chain::now_unix;
use janus_dns_application::ports::RecordCache;
use janus_dns_domain::{CachedRecord, DnsError, RecordType};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, warn};

/// Grace added to the physical key expiry beyond the logical one; the
/// logical per-item check stays authoritative.
const PHYSICAL_EXPIRY_MARGIN: u64 = 60;

fn cache_key(name: &str, rtype: RecordType) -> String {
    format!("dns:{}:{}", name, rtype.to_u16())
}

/// Shared record cache on redis: one sorted set per key, member = JSON item,
/// score = expiry instant. Reads trim expired members opportunistically.
/// Backend failures degrade to a miss (reads) or a no-op (writes).
pub struct RedisRecordCache {
    conn: ConnectionManager,
}

impl RedisRecordCache {
    pub async fn connect(url: &str) -> Result<Self, DnsError> {
        let client = redis::Client::open(url)
            .map_err(|e| DnsError::Config(format!("invalid redis url: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| DnsError::CacheBackend(format!("redis connect failed: {}", e)))?;
        Ok(Self { conn })
    }

    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    async fn get_inner(&self, key: &str, now: u64) -> Result<Vec<CachedRecord>, redis::RedisError> {
        let mut conn = self.conn.clone();

        let _: () = redis::cmd("ZREMRANGEBYSCORE")
            .arg(key)
            .arg("-inf")
            .arg(now)
            .query_async(&mut conn)
            .await?;

        let members: Vec<String> = redis::cmd("ZRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await?;

        let mut items = Vec::with_capacity(members.len());
        for member in members {
            match serde_json::from_str::<CachedRecord>(&member) {
                Ok(item) if !item.is_expired(now) => items.push(item),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "Dropping undecodable cache member"),
            }
        }

        if items.is_empty() {
            let _: () = conn.del(key).await?;
        }
        Ok(items)
    }

    async fn set_inner(
        &self,
        key: &str,
        items: &[CachedRecord],
        now: u64,
    ) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.cmd("DEL").arg(key).ignore();
        let mut max_expiry = now;
        for item in items {
            let member = match serde_json::to_string(item) {
                Ok(json) => json,
                Err(e) => {
                    debug!(error = %e, "Skipping unencodable cache item");
                    continue;
                }
            };
            max_expiry = max_expiry.max(item.expires_at());
            pipe.cmd("ZADD").arg(key).arg(item.expires_at()).arg(member).ignore();
        }
        pipe.cmd("EXPIRE")
            .arg(key)
            .arg(max_expiry.saturating_sub(now) + PHYSICAL_EXPIRY_MARGIN)
            .ignore();

        let result: Result<(), redis::RedisError> = pipe.query_async(&mut conn).await;
        result
    }
}

#[async_trait]
impl RecordCache for RedisRecordCache {
    async fn get(&self, name: &str, rtype: RecordType) -> Option<Vec<CachedRecord>> {
        let key = cache_key(name, rtype);
        match self.get_inner(&key, now_unix()).await {
            Ok(items) if items.is_empty() => None,
            Ok(items) => Some(items),
            Err(e) => {
                warn!(key = %key, error = %e, "Redis read failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, name: &str, rtype: RecordType, items: Vec<CachedRecord>) {
        if items.is_empty() {
            return;
        }
        let key = cache_key(name, rtype);
        if let Err(e) = self.set_inner(&key, &items, now_unix()).await {
            warn!(key = %key, error = %e, "Redis write failed, skipping cache");
        }
    }

    async fn delete(&self, name: &str, rtype: RecordType) {
        let key = cache_key(name, rtype);
        let mut conn = self.conn.clone();
        if let Err(e) = conn.del::<_, ()>(&key).await {
            warn!(key = %key, error = %e, "Redis delete failed");
        }
    }

    async fn clear(&self) {
        if let Err(e) = clear_prefix(self.conn.clone(), "dns:*").await {
            warn!(error = %e, "Redis clear failed");
        }
    }
}

/// Delete every key matching a pattern, SCAN-based so the server is never
/// blocked by a huge keyspace.
pub(crate) async fn clear_prefix(
    mut conn: ConnectionManager,
    pattern: &str,
) -> Result<(), redis::RedisError> {
    let keys: Vec<String> = {
        let mut iter = conn.scan_match::<_, String>(pattern).await?;
        let mut keys = Vec::new();
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        keys
    };

    for chunk in keys.chunks(100) {
        let _: () = conn.del(chunk).await?;
    }
    Ok(())
}
