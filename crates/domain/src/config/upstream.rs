use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The three group names every configuration must provide.
pub const REQUIRED_GROUPS: [&str; 3] = ["proxy", "proxy_ecs", "direct"];
/// The group that receives the global default ECS address when its own
/// `ecs_ip` is empty.
pub const ECS_GROUP: &str = "proxy_ecs";
/// The implicit outbound tag.
pub const DIRECT_OUTBOUND: &str = "direct";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpstreamGroupConfig {
    #[serde(default)]
    pub nameservers: Vec<String>,
    /// Outbound tag; empty means direct.
    #[serde(default)]
    pub outbound: String,
    /// ECS address (CIDR or plain); empty disables injection for the group.
    #[serde(default)]
    pub ecs_ip: String,
}

impl UpstreamGroupConfig {
    pub fn outbound_tag(&self) -> &str {
        if self.outbound.is_empty() {
            DIRECT_OUTBOUND
        } else {
            &self.outbound
        }
    }
}

/// Ordered map so iteration (and error messages) stay deterministic.
pub type UpstreamGroups = BTreeMap<String, UpstreamGroupConfig>;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutboundConfig {
    pub tag: String,
    /// "direct" or "socks5".
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_enable")]
    pub enable: bool,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn default_enable() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EcsConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub default_ipv4: String,
    #[serde(default)]
    pub default_ipv6: String,
    #[serde(default = "default_v4_prefix")]
    pub ipv4_prefix: u8,
    #[serde(default = "default_v6_prefix")]
    pub ipv6_prefix: u8,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            enable: false,
            default_ipv4: String::new(),
            default_ipv6: String::new(),
            ipv4_prefix: default_v4_prefix(),
            ipv6_prefix: default_v6_prefix(),
        }
    }
}

fn default_v4_prefix() -> u8 {
    24
}

fn default_v6_prefix() -> u8 {
    56
}
