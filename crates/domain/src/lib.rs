pub mod config;
pub mod ecs;
pub mod endpoint;
pub mod errors;
pub mod policy;
pub mod question;
pub mod record;
pub mod rule;

pub use config::{Config, ConfigError};
pub use ecs::EcsAddress;
pub use endpoint::{DnsEndpoint, EndpointAddr};
pub use errors::DnsError;
pub use policy::{
    BlockAction, PolicyOptions, PolicyTarget, QueryPolicy, LEARNED_DIRECT, LEARNED_PROXY,
    UNKNOWN_CATEGORY,
};
pub use question::{normalize_name, strip_fqdn, Question};
pub use record::{
    CachedRecord, DnsReply, Rcode, RecordData, RecordType, ResourceRecord, MAX_TTL_SECS,
};
pub use rule::RuleToken;
