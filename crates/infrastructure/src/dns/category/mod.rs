pub mod catalog;
pub mod dlc;
pub mod memory;
pub mod redis;

pub use catalog::CategoryCatalog;
pub use memory::MemoryCategoryStore;
pub use redis::RedisCategoryStore;

use janus_dns_application::ports::CategoryStore;
use janus_dns_domain::config::DomainGroups;
use janus_dns_domain::DnsError;
use tracing::info;

/// Parse a catalog file and load the configured domain groups into the
/// category store. Returns the number of entries written.
pub async fn preload(
    store: &dyn CategoryStore,
    catalog_bytes: &[u8],
    groups: &DomainGroups,
) -> Result<usize, DnsError> {
    let catalog = CategoryCatalog::parse(catalog_bytes)?;
    let entries = catalog.expand(groups)?;
    let count = entries.len();
    store.bulk_set(entries).await;
    info!(entries = count, "Category preload complete");
    Ok(count)
}
