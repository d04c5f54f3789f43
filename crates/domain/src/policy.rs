use crate::rule::RuleToken;
use std::sync::Arc;

/// Category tag learned for names the ecs-fallback race decided to resolve
/// through the `direct` group.
pub const LEARNED_DIRECT: &str = "direct_site";
/// Category tag learned for names the ecs-fallback race decided to resolve
/// through the `proxy` group.
pub const LEARNED_PROXY: &str = "proxy_site";

/// The distinguished catch-all category for names the classifier misses.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// What the router does with questions matching a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyTarget {
    /// Answer locally per the configured block action; no upstream, no cache.
    Block,
    /// Delegate to the concurrent proxy_ecs/proxy race.
    EcsFallback,
    /// Query the named upstream group.
    Group(Arc<str>),
}

impl PolicyTarget {
    pub fn parse(group: &str) -> Self {
        match group {
            "block" => PolicyTarget::Block,
            "proxy_ecs_fallback" => PolicyTarget::EcsFallback,
            other => PolicyTarget::Group(Arc::from(other)),
        }
    }
}

/// How a blocked question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockAction {
    #[default]
    NxDomain,
    NoError,
    /// NOERROR with 0.0.0.0 / :: answers.
    ZeroIp,
}

impl BlockAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "nxdomain" => Some(BlockAction::NxDomain),
            "noerror" => Some(BlockAction::NoError),
            "0.0.0.0" => Some(BlockAction::ZeroIp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PolicyOptions {
    pub disable_cache: bool,
    pub disable_ipv6: bool,
    /// When non-zero, every cached record from this policy gets this TTL.
    pub rewrite_ttl: u32,
    /// Per-policy ECS override, raw as configured.
    pub ecs: Option<Arc<str>>,
    pub expected_ips: Vec<RuleToken>,
    pub fallback_group: Option<Arc<str>>,
    pub block_action: BlockAction,
    /// TTL for synthesized 0.0.0.0 block answers.
    pub block_ttl: u32,
    pub auto_categorize: bool,
}

/// One entry of the ordered routing policy list.
#[derive(Debug, Clone)]
pub struct QueryPolicy {
    pub name: Arc<str>,
    pub target: PolicyTarget,
    pub options: PolicyOptions,
}

impl QueryPolicy {
    /// The synthetic final catch-all used when no policy matches a category.
    pub fn synthetic_unknown() -> Self {
        Self {
            name: Arc::from(UNKNOWN_CATEGORY),
            target: PolicyTarget::EcsFallback,
            options: PolicyOptions {
                auto_categorize: true,
                ..PolicyOptions::default()
            },
        }
    }
}
