use crate::policy::{BlockAction, PolicyOptions, PolicyTarget, QueryPolicy};
use crate::rule::RuleToken;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::errors::ConfigError;

const DEFAULT_BLOCK_TTL: u32 = 60;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryPolicyConfig {
    pub name: String,
    pub group: String,
    #[serde(default)]
    pub options: QueryPolicyOptions,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryPolicyOptions {
    #[serde(default)]
    pub disable_cache: bool,
    #[serde(default)]
    pub disable_ipv6: bool,
    #[serde(default)]
    pub rewrite_ttl: u32,
    /// Per-policy ECS override (CIDR), taking precedence over the group's.
    #[serde(default)]
    pub ecs: String,
    #[serde(default)]
    pub expected_ips: Vec<String>,
    #[serde(default)]
    pub fallback_group: String,
    /// "nxdomain", "noerror" or "0.0.0.0"; only meaningful with group "block".
    #[serde(default)]
    pub block_type: String,
    #[serde(default = "default_block_ttl")]
    pub block_ttl: u32,
    #[serde(default = "default_true")]
    pub auto_categorize: bool,
}

impl Default for QueryPolicyOptions {
    fn default() -> Self {
        Self {
            disable_cache: false,
            disable_ipv6: false,
            rewrite_ttl: 0,
            ecs: String::new(),
            expected_ips: Vec::new(),
            fallback_group: String::new(),
            block_type: String::new(),
            block_ttl: default_block_ttl(),
            auto_categorize: true,
        }
    }
}

fn default_block_ttl() -> u32 {
    DEFAULT_BLOCK_TTL
}

fn default_true() -> bool {
    true
}

impl QueryPolicyConfig {
    /// Build the runtime policy, parsing rule tokens and the block action.
    pub fn to_policy(&self) -> Result<QueryPolicy, ConfigError> {
        let expected_ips = self
            .options
            .expected_ips
            .iter()
            .map(|raw| {
                raw.parse::<RuleToken>().map_err(|e| {
                    ConfigError::Validation(format!(
                        "query_policy '{}': expected_ips: {}",
                        self.name, e
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let block_action = if self.options.block_type.is_empty() {
            BlockAction::default()
        } else {
            BlockAction::parse(&self.options.block_type).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "query_policy '{}': invalid block_type '{}'",
                    self.name, self.options.block_type
                ))
            })?
        };

        Ok(QueryPolicy {
            name: Arc::from(self.name.as_str()),
            target: PolicyTarget::parse(&self.group),
            options: PolicyOptions {
                disable_cache: self.options.disable_cache,
                disable_ipv6: self.options.disable_ipv6,
                rewrite_ttl: self.options.rewrite_ttl,
                ecs: if self.options.ecs.is_empty() {
                    None
                } else {
                    Some(Arc::from(self.options.ecs.as_str()))
                },
                expected_ips,
                fallback_group: if self.options.fallback_group.is_empty() {
                    None
                } else {
                    Some(Arc::from(self.options.fallback_group.as_str()))
                },
                block_action,
                block_ttl: self.options.block_ttl,
                auto_categorize: self.options.auto_categorize,
            },
        })
    }
}
