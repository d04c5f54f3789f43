use super::dlc::{CatalogDomain, DomainKind};
use janus_dns_domain::config::DomainGroups;
use janus_dns_domain::DnsError;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A parsed vendor catalog ready for spec selection.
pub struct CategoryCatalog {
    lists: HashMap<String, Vec<CatalogDomain>>,
}

impl CategoryCatalog {
    pub fn parse(bytes: &[u8]) -> Result<Self, DnsError> {
        Ok(Self {
            lists: super::dlc::parse_catalog(bytes)?,
        })
    }

    #[cfg(test)]
    pub fn from_lists(lists: HashMap<String, Vec<CatalogDomain>>) -> Self {
        Self { lists }
    }

    /// Expand the configured domain groups into one domain → tag map.
    ///
    /// Groups are applied in reverse configured order, so when two specs
    /// contribute the same domain the earlier-listed tag is the one left
    /// standing (last write wins).
    pub fn expand(&self, groups: &DomainGroups) -> Result<HashMap<String, String>, DnsError> {
        let mut map = HashMap::new();
        for (tag, specs) in groups.iter().rev() {
            for spec in specs {
                for value in self.select(spec)? {
                    map.insert(value, tag.clone());
                }
            }
        }
        Ok(map)
    }

    /// Domains selected by one spec: `listname`, `listname@attr`, or
    /// `listname@!attr`; multiple attribute filters AND together. Regex
    /// entries cannot feed a suffix classifier and are skipped.
    fn select(&self, spec: &str) -> Result<Vec<String>, DnsError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(DnsError::Config("empty category spec".into()));
        }

        let mut parts = spec.split('@');
        let list_name = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        let filters: Vec<&str> = parts.map(str::trim).filter(|f| !f.is_empty()).collect();

        let domains = self.lists.get(&list_name).ok_or_else(|| {
            DnsError::Config(format!("category '{}' not found in catalog", spec))
        })?;

        let mut selected = Vec::new();
        let mut skipped_regex = 0usize;
        for domain in domains {
            if domain.kind() == DomainKind::Regex {
                skipped_regex += 1;
                continue;
            }
            if !matches_all_filters(domain, &filters) {
                continue;
            }
            selected.push(domain.value.to_ascii_lowercase());
        }

        if skipped_regex > 0 {
            debug!(spec = %spec, skipped_regex, "Skipped regex catalog entries");
        }
        if selected.is_empty() && !filters.is_empty() {
            warn!(spec = %spec, "Category spec selected no domains after attribute filtering");
        }

        Ok(selected)
    }
}

/// AND across all filters; `!attr` negates a single attribute test.
fn matches_all_filters(domain: &CatalogDomain, filters: &[&str]) -> bool {
    filters.iter().all(|filter| {
        let (negate, key) = match filter.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, *filter),
        };
        domain.has_attribute(key) != negate
    })
}
