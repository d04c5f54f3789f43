use super::upstream::{DIRECT_OUTBOUND, REQUIRED_GROUPS};
use super::{Config, ConfigError};
use crate::ecs::EcsAddress;
use crate::endpoint::DnsEndpoint;
use crate::policy::{LEARNED_DIRECT, LEARNED_PROXY, UNKNOWN_CATEGORY};
use crate::rule::RuleToken;
use cron::Schedule;
use std::collections::HashMap;
use std::net::IpAddr;
use std::str::FromStr;

impl Config {
    /// Validate every startup obligation. Called once before any component
    /// is built; a failure here aborts the process.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_bootstrap()?;
        let outbound_kinds = self.validate_outbounds()?;
        self.validate_groups(&outbound_kinds)?;
        self.validate_ecs()?;
        self.validate_cache()?;
        self.validate_policies()?;
        self.validate_fallback()?;
        self.validate_log()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port cannot be 0".into()));
        }
        if self.server.protocol != "udp" {
            return Err(ConfigError::Validation(format!(
                "server.protocol must be \"udp\", got '{}'",
                self.server.protocol
            )));
        }
        self.server
            .bind
            .parse::<IpAddr>()
            .map_err(|_| {
                ConfigError::Validation(format!("server.bind is not an address: '{}'", self.server.bind))
            })?;
        Ok(())
    }

    fn validate_bootstrap(&self) -> Result<(), ConfigError> {
        for ns in &self.bootstrap.nameservers {
            let host = ns.rsplit_once(':').map(|(h, _)| h).unwrap_or(ns);
            if host.parse::<IpAddr>().is_err() && ns.parse::<IpAddr>().is_err() {
                return Err(ConfigError::Validation(format!(
                    "bootstrap.nameservers must be plain addresses, got '{}'",
                    ns
                )));
            }
        }
        Ok(())
    }

    /// Returns tag → kind for reference checks. The implicit `direct` tag is
    /// always present.
    fn validate_outbounds(&self) -> Result<HashMap<String, String>, ConfigError> {
        let mut kinds = HashMap::new();
        kinds.insert(DIRECT_OUTBOUND.to_string(), "direct".to_string());

        for ob in &self.outbound {
            if ob.tag.is_empty() {
                return Err(ConfigError::Validation("outbound entry without a tag".into()));
            }
            match ob.kind.as_str() {
                "direct" => {}
                "socks5" => {
                    if ob.server.is_empty() || ob.port == 0 {
                        return Err(ConfigError::Validation(format!(
                            "socks5 outbound '{}' needs server and port",
                            ob.tag
                        )));
                    }
                }
                other => {
                    return Err(ConfigError::Validation(format!(
                        "outbound '{}': unknown type '{}'",
                        ob.tag, other
                    )));
                }
            }
            kinds.insert(ob.tag.clone(), ob.kind.clone());
        }
        Ok(kinds)
    }

    fn validate_groups(&self, outbound_kinds: &HashMap<String, String>) -> Result<(), ConfigError> {
        for name in REQUIRED_GROUPS {
            let group = self.upstream_group.get(name).ok_or_else(|| {
                ConfigError::Validation(format!("missing required upstream group '{}'", name))
            })?;
            if group.nameservers.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "upstream group '{}' needs at least one nameserver",
                    name
                )));
            }
        }

        for (name, group) in &self.upstream_group {
            let tag = group.outbound_tag();
            let kind = outbound_kinds.get(tag).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "upstream group '{}' references unknown outbound '{}'",
                    name, tag
                ))
            })?;

            for ns in &group.nameservers {
                let endpoint = ns.parse::<DnsEndpoint>().map_err(|e| {
                    ConfigError::Validation(format!("upstream group '{}': {}", name, e))
                })?;
                // A proxied outbound can only carry stream transports.
                if kind != "direct" && !endpoint.proxyable() {
                    return Err(ConfigError::Validation(format!(
                        "upstream group '{}' uses outbound '{}' but nameserver '{}' is not https:// or tcp://",
                        name, tag, ns
                    )));
                }
            }

            if !group.ecs_ip.is_empty() {
                group.ecs_ip.parse::<EcsAddress>().map_err(|e| {
                    ConfigError::Validation(format!("upstream group '{}': {}", name, e))
                })?;
            }
        }
        Ok(())
    }

    fn validate_ecs(&self) -> Result<(), ConfigError> {
        if !self.ecs.enable {
            return Ok(());
        }
        if !self.ecs.default_ipv4.is_empty() {
            self.ecs
                .default_ipv4
                .parse::<EcsAddress>()
                .map_err(|e| ConfigError::Validation(format!("ecs.default_ipv4: {}", e)))?;
        }
        if !self.ecs.default_ipv6.is_empty() {
            self.ecs
                .default_ipv6
                .parse::<EcsAddress>()
                .map_err(|e| ConfigError::Validation(format!("ecs.default_ipv6: {}", e)))?;
        }
        if !(8..=32).contains(&self.ecs.ipv4_prefix) {
            return Err(ConfigError::Validation(
                "ecs.ipv4_prefix must be in 8..=32".into(),
            ));
        }
        if !(32..=128).contains(&u16::from(self.ecs.ipv6_prefix)) {
            return Err(ConfigError::Validation(
                "ecs.ipv6_prefix must be in 32..=128".into(),
            ));
        }
        Ok(())
    }

    fn validate_cache(&self) -> Result<(), ConfigError> {
        let uses_redis = |backend: &str| backend == "redis";
        for (section, backend) in [
            ("cache.dns_cache", self.cache.dns_cache.backend.as_str()),
            (
                "cache.category_cache",
                self.cache.category_cache.backend.as_str(),
            ),
        ] {
            if backend != "memory" && backend != "redis" {
                return Err(ConfigError::Validation(format!(
                    "{}.type must be \"memory\" or \"redis\", got '{}'",
                    section, backend
                )));
            }
            if uses_redis(backend) && self.redis.server.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{} uses redis but redis.server is empty",
                    section
                )));
            }
        }
        Ok(())
    }

    fn validate_policies(&self) -> Result<(), ConfigError> {
        let preload = &self.category_policy.preload;
        if preload.enable && preload.file.is_empty() {
            return Err(ConfigError::Validation(
                "category_policy.preload.file is required when preload is enabled".into(),
            ));
        }
        if !preload.update.is_empty() {
            Schedule::from_str(&preload.update).map_err(|e| {
                ConfigError::Validation(format!("category_policy.preload.update: {}", e))
            })?;
        }

        for policy in &self.query_policy {
            // Parse-level checks (tokens, block action).
            policy.to_policy()?;

            let known_tag = policy.name == UNKNOWN_CATEGORY
                || policy.name == LEARNED_DIRECT
                || policy.name == LEARNED_PROXY
                || preload.domain_group.contains_tag(&policy.name);
            if !known_tag {
                return Err(ConfigError::Validation(format!(
                    "query_policy '{}' does not match any domain_group tag",
                    policy.name
                )));
            }

            if policy.group != "block"
                && policy.group != "proxy_ecs_fallback"
                && !self.upstream_group.contains_key(&policy.group)
            {
                return Err(ConfigError::Validation(format!(
                    "query_policy '{}' references unknown group '{}'",
                    policy.name, policy.group
                )));
            }

            let fallback = &policy.options.fallback_group;
            if !fallback.is_empty() && !self.upstream_group.contains_key(fallback.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "query_policy '{}' references unknown fallback_group '{}'",
                    policy.name, fallback
                )));
            }

            if !policy.options.ecs.is_empty() {
                policy.options.ecs.parse::<EcsAddress>().map_err(|e| {
                    ConfigError::Validation(format!("query_policy '{}': ecs: {}", policy.name, e))
                })?;
            }
        }
        Ok(())
    }

    fn validate_fallback(&self) -> Result<(), ConfigError> {
        if self.fallback.strategy != "race" {
            return Err(ConfigError::Validation(format!(
                "fallback.strategy must be \"race\", got '{}'",
                self.fallback.strategy
            )));
        }
        for raw in &self.fallback.rule {
            raw.parse::<RuleToken>()
                .map_err(|e| ConfigError::Validation(format!("fallback.rule: {}", e)))?;
        }
        if !self.fallback.update.is_empty() {
            Schedule::from_str(&self.fallback.update)
                .map_err(|e| ConfigError::Validation(format!("fallback.update: {}", e)))?;
        }
        Ok(())
    }

    fn validate_log(&self) -> Result<(), ConfigError> {
        if !["debug", "info", "warn", "error"].contains(&self.log.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "log.level must be debug/info/warn/error, got '{}'",
                self.log.level
            )));
        }
        if !["json", "text"].contains(&self.log.format.as_str()) {
            return Err(ConfigError::Validation(format!(
                "log.format must be json or text, got '{}'",
                self.log.format
            )));
        }
        Ok(())
    }
}
