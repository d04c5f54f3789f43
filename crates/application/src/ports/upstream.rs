use async_trait::async_trait;
use janus_dns_domain::{DnsError, DnsReply, Question};

/// The upstream group manager: resolve a question through a named group,
/// racing its nameservers and returning the first usable reply.
#[async_trait]
pub trait UpstreamDns: Send + Sync {
    /// `ecs_override` replaces the group's own ECS address for this query
    /// (the per-policy `ecs` option).
    async fn query(
        &self,
        group: &str,
        question: &Question,
        ecs_override: Option<&str>,
    ) -> Result<DnsReply, DnsError>;
}
