use crate::ports::CategoryStore;
use janus_dns_domain::strip_fqdn;
use smallvec::SmallVec;
use std::sync::Arc;

/// Hierarchical suffix lookup against the category store.
///
/// `www.google.com` probes `www.google.com`, then `google.com`, then `com`;
/// the first hit wins, so the longest matching suffix is preferred.
pub struct DomainClassifier {
    store: Arc<dyn CategoryStore>,
}

impl DomainClassifier {
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        Self { store }
    }

    pub async fn classify(&self, name: &str) -> Option<Arc<str>> {
        let domain = strip_fqdn(name).to_ascii_lowercase();
        if domain.is_empty() {
            return None;
        }

        if let Some(tag) = self.store.get(&domain).await {
            return Some(tag);
        }

        let labels: SmallVec<[&str; 8]> = domain.split('.').collect();
        for start in 1..labels.len() {
            let parent = labels[start..].join(".");
            if let Some(tag) = self.store.get(&parent).await {
                return Some(tag);
            }
        }

        None
    }
}
