mod category_store;
mod ip_rules;
mod rr_cache;
mod upstream;

pub use category_store::CategoryStore;
pub use ip_rules::IpRules;
pub use rr_cache::RecordCache;
pub use upstream::UpstreamDns;
