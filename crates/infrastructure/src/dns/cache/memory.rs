use async_trait::async_trait;
use dashmap::DashMap;
use janus_dns_application::chain::now_unix;
use janus_dns_application::ports::RecordCache;
use janus_dns_domain::{CachedRecord, RecordType};
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    name: Arc<str>,
    rtype: u16,
}

impl CacheKey {
    fn new(name: &str, rtype: RecordType) -> Self {
        Self {
            name: Arc::from(name),
            rtype: rtype.to_u16(),
        }
    }
}

/// In-process record cache. Writes replace whole keys, so a concurrent
/// reader sees either the full old set or the full new set. Expired items
/// are dropped on access; the minute sweeper removes keys that expired
/// without being read again.
pub struct MemoryRecordCache {
    entries: DashMap<CacheKey, Vec<CachedRecord>, FxBuildHasher>,
}

impl MemoryRecordCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_hasher(FxBuildHasher),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryRecordCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordCache for MemoryRecordCache {
    async fn get(&self, name: &str, rtype: RecordType) -> Option<Vec<CachedRecord>> {
        let key = CacheKey::new(name, rtype);
        let now = now_unix();

        let (valid, expired_some) = {
            let entry = self.entries.get(&key)?;
            let valid: Vec<CachedRecord> = entry
                .iter()
                .filter(|item| !item.is_expired(now))
                .cloned()
                .collect();
            let expired_some = valid.len() < entry.len();
            (valid, expired_some)
        };

        if valid.is_empty() {
            self.entries.remove(&key);
            return None;
        }
        if expired_some {
            self.entries.insert(key, valid.clone());
        }
        Some(valid)
    }

    async fn set(&self, name: &str, rtype: RecordType, items: Vec<CachedRecord>) {
        if items.is_empty() {
            return;
        }
        self.entries.insert(CacheKey::new(name, rtype), items);
    }

    async fn delete(&self, name: &str, rtype: RecordType) {
        self.entries.remove(&CacheKey::new(name, rtype));
    }

    async fn clear(&self) {
        self.entries.clear();
    }

    async fn sweep(&self) {
        let now = now_unix();
        let before = self.entries.len();
        self.entries
            .retain(|_, items| items.iter().any(|item| !item.is_expired(now)));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Cache sweep");
        }
    }
}
