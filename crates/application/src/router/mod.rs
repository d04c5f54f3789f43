mod ecs_fallback;

use crate::chain::{self, ChainResolution};
use crate::classify::DomainClassifier;
use crate::ports::{CategoryStore, IpRules, RecordCache, UpstreamDns};
use janus_dns_domain::{
    BlockAction, DnsError, DnsReply, PolicyTarget, Question, QueryPolicy, Rcode, RecordData,
    RecordType, ResourceRecord, RuleToken, UNKNOWN_CATEGORY,
};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

pub struct QueryRouter {
    cache: Arc<dyn RecordCache>,
    cache_enabled: bool,
    classifier: DomainClassifier,
    categories: Arc<dyn CategoryStore>,
    rules: Arc<dyn IpRules>,
    upstreams: Arc<dyn UpstreamDns>,
    policies: Vec<QueryPolicy>,
    fallback_rules: Arc<[RuleToken]>,
}

impl QueryRouter {
    pub fn new(
        cache: Arc<dyn RecordCache>,
        cache_enabled: bool,
        categories: Arc<dyn CategoryStore>,
        rules: Arc<dyn IpRules>,
        upstreams: Arc<dyn UpstreamDns>,
        policies: Vec<QueryPolicy>,
        fallback_rules: Vec<RuleToken>,
    ) -> Self {
        Self {
            cache,
            cache_enabled,
            classifier: DomainClassifier::new(categories.clone()),
            categories,
            rules,
            upstreams,
            policies,
            fallback_rules: fallback_rules.into(),
        }
    }

    /// Route one question: cache chain, classify, apply the first matching
    /// policy, validate answer addresses, cache the result.
    pub async fn route(&self, question: &Question) -> Result<DnsReply, DnsError> {
        let trace_id = format!("{:08x}", fastrand::u32(..));
        let span = info_span!("route", trace_id = %trace_id, question = %question);
        self.route_inner(question).instrument(span).await
    }

    async fn route_inner(&self, question: &Question) -> Result<DnsReply, DnsError> {
        let now = chain::now_unix();

        // Cached CNAME chain first; a complete chain never touches upstream.
        let resolution = if self.cache_enabled {
            chain::resolve_chain(self.cache.as_ref(), question, now).await
        } else {
            ChainResolution {
                collected: Vec::new(),
                need_upstream: true,
                pivot: question.name.clone(),
                rcode: Rcode::NoError,
                authenticated: false,
                recursion_available: false,
            }
        };
        if !resolution.need_upstream {
            debug!(answers = resolution.collected.len(), "Serving from cache");
            return Ok(resolution.into_reply());
        }

        let category = match self.classifier.classify(&question.name).await {
            Some(tag) => tag,
            None => Arc::from(UNKNOWN_CATEGORY),
        };

        let policy = self
            .policies
            .iter()
            .find(|p| p.name == category)
            .cloned()
            .unwrap_or_else(QueryPolicy::synthetic_unknown);
        debug!(category = %category, policy = %policy.name, "Policy selected");

        if policy.options.disable_ipv6 && question.rtype == RecordType::Aaaa {
            return Ok(DnsReply::empty(Rcode::NoError));
        }

        match &policy.target {
            PolicyTarget::Block => {
                debug!(action = ?policy.options.block_action, "Blocking query");
                Ok(block_reply(question, &policy.options.block_action, policy.options.block_ttl))
            }
            PolicyTarget::EcsFallback => {
                let reply = ecs_fallback::run(
                    self.upstreams.clone(),
                    self.rules.clone(),
                    self.categories.clone(),
                    &self.fallback_rules,
                    question,
                    policy.options.auto_categorize,
                )
                .await?;
                self.finish(reply, &policy, now).await
            }
            PolicyTarget::Group(group) => {
                let pivot_question = question.with_name(&resolution.pivot);
                let upstream_reply = self
                    .upstreams
                    .query(group, &pivot_question, policy.options.ecs.as_deref())
                    .await?;
                let merged = chain::merge_reply(resolution.collected.clone(), upstream_reply);

                if self.addresses_pass(&merged, &policy.options.expected_ips) {
                    return self.finish(merged, &policy, now).await;
                }

                match &policy.options.fallback_group {
                    Some(fallback) => {
                        debug!(
                            group = %group,
                            fallback = %fallback,
                            "Answer addresses outside expected_ips, retrying via fallback group"
                        );
                        let retry = self
                            .upstreams
                            .query(fallback, &pivot_question, policy.options.ecs.as_deref())
                            .await?;
                        // The fallback answer is final; it is not re-validated.
                        let merged = chain::merge_reply(resolution.collected.clone(), retry);
                        self.finish(merged, &policy, now).await
                    }
                    None => {
                        debug!(group = %group, "Answer addresses outside expected_ips, escalating");
                        let reply = ecs_fallback::run(
                            self.upstreams.clone(),
                            self.rules.clone(),
                            self.categories.clone(),
                            &self.fallback_rules,
                            question,
                            policy.options.auto_categorize,
                        )
                        .await?;
                        self.finish(reply, &policy, now).await
                    }
                }
            }
        }
    }

    /// Validation passes when there are no addresses to judge, or when every
    /// address matches at least one expected rule.
    fn addresses_pass(&self, reply: &DnsReply, expected: &[RuleToken]) -> bool {
        if expected.is_empty() {
            return true;
        }
        let addresses = reply.addresses();
        if addresses.is_empty() {
            return true;
        }
        addresses
            .iter()
            .all(|ip| self.rules.match_any(*ip, expected))
    }

    async fn finish(
        &self,
        reply: DnsReply,
        policy: &QueryPolicy,
        now: u64,
    ) -> Result<DnsReply, DnsError> {
        if self.cache_enabled && !policy.options.disable_cache {
            chain::store_response(
                self.cache.as_ref(),
                &reply,
                policy.options.rewrite_ttl,
                now,
            )
            .await;
        }
        Ok(reply)
    }
}

fn block_reply(question: &Question, action: &BlockAction, block_ttl: u32) -> DnsReply {
    match action {
        BlockAction::NxDomain => DnsReply::empty(Rcode::NxDomain),
        BlockAction::NoError => DnsReply::empty(Rcode::NoError),
        BlockAction::ZeroIp => {
            let mut reply = DnsReply::empty(Rcode::NoError);
            let data = match question.rtype {
                RecordType::A => Some(RecordData::A(Ipv4Addr::UNSPECIFIED)),
                RecordType::Aaaa => Some(RecordData::Aaaa(Ipv6Addr::UNSPECIFIED)),
                _ => None,
            };
            if let Some(data) = data {
                reply.answers.push(ResourceRecord {
                    name: question.name.clone(),
                    rtype: question.rtype,
                    class: 1,
                    ttl: block_ttl,
                    data,
                });
            }
            reply
        }
    }
}
