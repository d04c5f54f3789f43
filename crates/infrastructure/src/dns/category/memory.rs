use async_trait::async_trait;
use dashmap::DashMap;
use janus_dns_application::ports::CategoryStore;
use rustc_hash::FxBuildHasher;
use std::collections::HashMap;
use std::sync::Arc;

/// In-process category map.
pub struct MemoryCategoryStore {
    entries: DashMap<String, Arc<str>, FxBuildHasher>,
}

impl MemoryCategoryStore {
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

impl Default for MemoryCategoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CategoryStore for MemoryCategoryStore {
    async fn get(&self, domain: &str) -> Option<Arc<str>> {
        self.entries.get(domain).map(|tag| tag.clone())
    }

    async fn set(&self, domain: &str, category: &str) {
        self.entries.insert(domain.to_string(), Arc::from(category));
    }

    async fn bulk_set(&self, entries: HashMap<String, String>) {
        for (domain, category) in entries {
            self.entries.insert(domain, Arc::from(category.as_str()));
        }
    }

    async fn delete(&self, domain: &str) {
        self.entries.remove(domain);
    }

    async fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let store = MemoryCategoryStore::new();
        store.set("baidu.com", "cn_site").await;
        assert_eq!(store.get("baidu.com").await.as_deref(), Some("cn_site"));

        store.delete("baidu.com").await;
        assert!(store.get("baidu.com").await.is_none());
    }

    #[tokio::test]
    async fn bulk_set_overwrites() {
        let store = MemoryCategoryStore::new();
        store.set("a.com", "old").await;
        store
            .bulk_set(HashMap::from([
                ("a.com".to_string(), "new".to_string()),
                ("b.com".to_string(), "tag".to_string()),
            ]))
            .await;
        assert_eq!(store.get("a.com").await.as_deref(), Some("new"));
        assert_eq!(store.len(), 2);
    }
}
