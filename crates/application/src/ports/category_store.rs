use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// The domain-category map behind the classifier. Keys are bare lowercase
/// domain labels (no trailing dot); values are short category tags.
///
/// Bulk-populated at startup and on refresh, point-updated by the
/// ecs-fallback strategy when it learns a name. Backend failures are logged
/// inside the implementation; reads degrade to a miss.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn get(&self, domain: &str) -> Option<Arc<str>>;

    async fn set(&self, domain: &str, category: &str);

    async fn bulk_set(&self, entries: HashMap<String, String>);

    async fn delete(&self, domain: &str);

    async fn clear(&self);
}
