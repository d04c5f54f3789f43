use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoryPolicyConfig {
    #[serde(default)]
    pub preload: PreloadConfig,
}

/// Category database preload. `domain_group` maps a category tag to the list
/// of vendor-catalog specs (`listname`, `listname@attr`, `listname@!attr`)
/// feeding it. The configured order matters: ingestion runs it from last to
/// first so earlier-listed tags win where catalogs overlap.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PreloadConfig {
    #[serde(default)]
    pub enable: bool,
    /// Local path or http(s) URL of the vendor catalog.
    #[serde(default)]
    pub file: String,
    /// Cron expression for periodic re-ingestion; empty disables.
    #[serde(default)]
    pub update: String,
    #[serde(default)]
    pub domain_group: DomainGroups,
}

/// The `domain_group` mapping with its document order preserved.
#[derive(Debug, Clone, Default)]
pub struct DomainGroups(pub Vec<(String, Vec<String>)>);

impl DomainGroups {
    pub fn contains_tag(&self, tag: &str) -> bool {
        self.0.iter().any(|(name, _)| name == tag)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &(String, Vec<String>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for DomainGroups {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = DomainGroups;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of category tag to catalog specs")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((tag, specs)) = map.next_entry::<String, Vec<String>>()? {
                    entries.push((tag, specs));
                }
                Ok(DomainGroups(entries))
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

impl Serialize for DomainGroups {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (tag, specs) in &self.0 {
            map.serialize_entry(tag, specs)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_group_order_is_preserved() {
        let yaml = r#"
enable: true
file: dlc.dat
domain_group:
  cn_site: ["geolocation-cn"]
  ads: ["category-ads-all"]
  direct_media: ["netflix@cn", "bilibili"]
"#;
        let preload: PreloadConfig = serde_yaml::from_str(yaml).unwrap();
        let tags: Vec<&str> = preload
            .domain_group
            .iter()
            .map(|(tag, _)| tag.as_str())
            .collect();
        assert_eq!(tags, ["cn_site", "ads", "direct_media"]);
        assert!(preload.domain_group.contains_tag("ads"));
        assert!(!preload.domain_group.contains_tag("unknown"));
    }
}
