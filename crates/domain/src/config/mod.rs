mod bootstrap;
mod cache;
mod category;
mod errors;
mod fallback;
mod logging;
mod policy;
mod server;
mod upstream;
mod validate;

pub use bootstrap::BootstrapConfig;
pub use cache::{CacheConfig, CategoryCacheConfig, DnsCacheConfig, RedisConfig};
pub use category::{CategoryPolicyConfig, DomainGroups, PreloadConfig};
pub use errors::ConfigError;
pub use fallback::FallbackConfig;
pub use logging::LogConfig;
pub use policy::{QueryPolicyConfig, QueryPolicyOptions};
pub use server::ServerConfig;
pub use upstream::{
    EcsConfig, OutboundConfig, UpstreamGroupConfig, UpstreamGroups, DIRECT_OUTBOUND, ECS_GROUP,
    REQUIRED_GROUPS,
};

use crate::policy::QueryPolicy;
use crate::rule::RuleToken;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub upstream_group: UpstreamGroups,
    #[serde(default)]
    pub outbound: Vec<OutboundConfig>,
    #[serde(default)]
    pub ecs: EcsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub category_policy: CategoryPolicyConfig,
    #[serde(default)]
    pub query_policy: Vec<QueryPolicyConfig>,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Pick `config.yaml` or `config.yml` inside a runtime directory.
    pub fn find_in_dir(dir: &Path) -> Option<String> {
        for candidate in ["config.yaml", "config.yml"] {
            let path = dir.join(candidate);
            if path.exists() {
                return Some(path.to_string_lossy().into_owned());
            }
        }
        None
    }

    /// The ordered runtime policy list, with tokens and actions parsed.
    pub fn policies(&self) -> Result<Vec<QueryPolicy>, ConfigError> {
        self.query_policy.iter().map(|p| p.to_policy()).collect()
    }

    /// The parsed global fallback ruleset.
    pub fn fallback_rules(&self) -> Result<Vec<RuleToken>, ConfigError> {
        self.fallback
            .rule
            .iter()
            .map(|raw| {
                raw.parse::<RuleToken>()
                    .map_err(|e| ConfigError::Validation(format!("fallback.rule: {}", e)))
            })
            .collect()
    }
}
