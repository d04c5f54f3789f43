//! Vendor category catalog: a protobuf list of site entries, each carrying a
//! category code and its domain patterns with optional attributes.

use janus_dns_domain::DnsError;
use prost::Message;
use std::collections::HashMap;

/// How a catalog domain value matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
pub enum DomainKind {
    /// Substring match in the vendor's engine; ingested as a plain key here.
    Plain = 0,
    /// Regular expression; not supported by the suffix classifier.
    Regex = 1,
    /// Matches the domain and every subdomain.
    Root = 2,
    /// Matches the exact domain only.
    Full = 3,
}

#[derive(Clone, PartialEq, Message)]
pub struct CatalogAttribute {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(oneof = "catalog_attribute::TypedValue", tags = "2, 3")]
    pub typed_value: Option<catalog_attribute::TypedValue>,
}

pub mod catalog_attribute {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum TypedValue {
        #[prost(bool, tag = "2")]
        BoolValue(bool),
        #[prost(int64, tag = "3")]
        IntValue(i64),
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct CatalogDomain {
    #[prost(enumeration = "DomainKind", tag = "1")]
    pub kind: i32,
    #[prost(string, tag = "2")]
    pub value: String,
    #[prost(message, repeated, tag = "3")]
    pub attribute: Vec<CatalogAttribute>,
}

impl CatalogDomain {
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attribute
            .iter()
            .any(|attr| attr.key.eq_ignore_ascii_case(key))
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct SiteEntry {
    #[prost(string, tag = "1")]
    pub country_code: String,
    #[prost(message, repeated, tag = "2")]
    pub domain: Vec<CatalogDomain>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SiteCatalog {
    #[prost(message, repeated, tag = "1")]
    pub entry: Vec<SiteEntry>,
}

/// Decode the binary catalog into list-name → domains, list names lowercased
/// for case-insensitive spec lookup.
pub fn parse_catalog(bytes: &[u8]) -> Result<HashMap<String, Vec<CatalogDomain>>, DnsError> {
    let catalog = SiteCatalog::decode(bytes)
        .map_err(|e| DnsError::Config(format!("failed to decode category catalog: {}", e)))?;

    let mut lists = HashMap::with_capacity(catalog.entry.len());
    for entry in catalog.entry {
        lists.insert(entry.country_code.to_ascii_lowercase(), entry.domain);
    }
    Ok(lists)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn domain(kind: DomainKind, value: &str, attrs: &[&str]) -> CatalogDomain {
        CatalogDomain {
            kind: kind as i32,
            value: value.to_string(),
            attribute: attrs
                .iter()
                .map(|key| CatalogAttribute {
                    key: key.to_string(),
                    typed_value: Some(catalog_attribute::TypedValue::BoolValue(true)),
                })
                .collect(),
        }
    }

    pub fn encode_catalog(entries: &[(&str, Vec<CatalogDomain>)]) -> Vec<u8> {
        let catalog = SiteCatalog {
            entry: entries
                .iter()
                .map(|(code, domains)| SiteEntry {
                    country_code: code.to_string(),
                    domain: domains.clone(),
                })
                .collect(),
        };
        let mut buf = Vec::new();
        catalog.encode(&mut buf).unwrap();
        buf
    }
}
