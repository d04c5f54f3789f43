use super::bootstrap::BootstrapResolver;
use super::group::UpstreamGroup;
use crate::dns::outbound::{DirectOutbound, Outbound, Socks5Outbound};
use crate::dns::transport::https;
use async_trait::async_trait;
use janus_dns_application::ports::UpstreamDns;
use janus_dns_domain::config::{DIRECT_OUTBOUND, ECS_GROUP};
use janus_dns_domain::{Config, DnsEndpoint, DnsError, DnsReply, EcsAddress, Question};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Holds every configured upstream group and answers the router's
/// group-by-name queries.
pub struct UpstreamManager {
    groups: HashMap<String, UpstreamGroup>,
}

impl UpstreamManager {
    /// Build groups from a validated config: construct outbounds and their
    /// DoH clients, parse endpoints, resolve hostnames via bootstrap, and
    /// wire the proxy_ecs default ECS address.
    pub async fn from_config(config: &Config) -> Result<Self, DnsError> {
        let mut outbounds: HashMap<String, Arc<dyn Outbound>> = HashMap::new();
        let mut http_clients: HashMap<String, reqwest::Client> = HashMap::new();
        outbounds.insert(DIRECT_OUTBOUND.to_string(), Arc::new(DirectOutbound));
        http_clients.insert(DIRECT_OUTBOUND.to_string(), https::direct_client());

        for ob in &config.outbound {
            if !ob.enable {
                continue;
            }
            match ob.kind.as_str() {
                "direct" => {
                    outbounds.insert(ob.tag.clone(), Arc::new(DirectOutbound));
                    http_clients.insert(ob.tag.clone(), https::direct_client());
                }
                "socks5" => {
                    outbounds.insert(
                        ob.tag.clone(),
                        Arc::new(Socks5Outbound::new(
                            ob.tag.clone(),
                            &ob.server,
                            ob.port,
                            ob.username.clone(),
                            ob.password.clone(),
                        )),
                    );
                    http_clients.insert(
                        ob.tag.clone(),
                        https::proxied_client(&ob.server, ob.port, &ob.username, &ob.password)?,
                    );
                    info!(tag = %ob.tag, server = %ob.server, port = ob.port, "SOCKS5 outbound ready");
                }
                other => {
                    return Err(DnsError::Config(format!(
                        "outbound '{}': unknown type '{}'",
                        ob.tag, other
                    )));
                }
            }
        }

        let bootstrap = BootstrapResolver::new(
            &config.bootstrap.nameservers,
            config.bootstrap.timeout,
        );

        let mut groups = HashMap::new();
        for (name, group_config) in &config.upstream_group {
            let tag = group_config.outbound_tag();
            let outbound = outbounds
                .get(tag)
                .cloned()
                .ok_or_else(|| DnsError::Config(format!("unknown outbound '{}'", tag)))?;
            let http_client = http_clients
                .get(tag)
                .cloned()
                .unwrap_or_else(https::direct_client);

            let mut endpoints = Vec::with_capacity(group_config.nameservers.len());
            for raw in &group_config.nameservers {
                let endpoint: DnsEndpoint = raw
                    .parse()
                    .map_err(|e| DnsError::Config(format!("group '{}': {}", name, e)))?;
                endpoints.push(resolve_endpoint(endpoint, &bootstrap).await);
            }

            // The proxy_ecs group inherits the global default when its own
            // ecs_ip is empty.
            let mut ecs_raw = group_config.ecs_ip.clone();
            if ecs_raw.is_empty() && name == ECS_GROUP && config.ecs.enable {
                ecs_raw = config.ecs.default_ipv4.clone();
            }
            let ecs = if ecs_raw.is_empty() {
                None
            } else {
                match ecs_raw.parse::<EcsAddress>() {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        debug!(group = %name, error = %e, "Skipping unparseable ECS address");
                        None
                    }
                }
            };

            info!(
                group = %name,
                nameservers = endpoints.len(),
                outbound = tag,
                ecs = ecs.is_some(),
                "Upstream group ready"
            );
            groups.insert(
                name.clone(),
                UpstreamGroup::new(name, endpoints, outbound, http_client, ecs),
            );
        }

        Ok(Self { groups })
    }

    pub fn group(&self, name: &str) -> Option<&UpstreamGroup> {
        self.groups.get(name)
    }
}

/// Swap an unresolved hostname endpoint for its bootstrap-resolved address.
/// Failures leave the endpoint as-is; it then loses the race at query time
/// instead of failing startup.
async fn resolve_endpoint(endpoint: DnsEndpoint, bootstrap: &BootstrapResolver) -> DnsEndpoint {
    if !endpoint.needs_resolution() {
        return endpoint;
    }
    let Some((hostname, port)) = endpoint.addr().and_then(|addr| addr.unresolved_parts()) else {
        return endpoint;
    };

    match bootstrap.resolve(hostname).await {
        Ok(ip) => endpoint.with_resolved_addr(SocketAddr::new(ip, port)),
        Err(e) => {
            warn!(nameserver = %endpoint, error = %e, "Bootstrap resolution failed");
            endpoint
        }
    }
}

#[async_trait]
impl UpstreamDns for UpstreamManager {
    async fn query(
        &self,
        group: &str,
        question: &Question,
        ecs_override: Option<&str>,
    ) -> Result<DnsReply, DnsError> {
        let group = self
            .groups
            .get(group)
            .ok_or_else(|| DnsError::UnknownGroup(group.to_string()))?;
        group.query(question, ecs_override).await
    }
}
