use async_trait::async_trait;
use janus_dns_domain::{CachedRecord, RecordType};

/// Record-level DNS cache keyed by (owner name, record type).
///
/// Backends swallow their own failures: a broken backend reads as a miss and
/// writes as a no-op, with a log trace. A query is never failed by its cache.
#[async_trait]
pub trait RecordCache: Send + Sync {
    /// Unexpired items under the key. A key whose every item is expired is
    /// removed and reported as a miss.
    async fn get(&self, name: &str, rtype: RecordType) -> Option<Vec<CachedRecord>>;

    /// Replace the whole key. All items must carry the same rcode/AD/RA.
    async fn set(&self, name: &str, rtype: RecordType, items: Vec<CachedRecord>);

    async fn delete(&self, name: &str, rtype: RecordType);

    async fn clear(&self);

    /// Drop keys whose every item is expired. Backends that trim on read may
    /// leave this a no-op.
    async fn sweep(&self) {}
}
