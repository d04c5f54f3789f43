use crate::ports::{CategoryStore, IpRules, UpstreamDns};
use janus_dns_domain::{
    strip_fqdn, DnsError, DnsReply, Question, RuleToken, LEARNED_DIRECT, LEARNED_PROXY,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const GROUP_PROXY_ECS: &str = "proxy_ecs";
const GROUP_PROXY: &str = "proxy";
const GROUP_DIRECT: &str = "direct";

/// Bound on the initial proxy_ecs/proxy race; results arriving later are
/// treated as absent.
const RACE_TIMEOUT: Duration = Duration::from_secs(3);

/// Decide where an unclassified name belongs by racing an ECS-enriched query
/// against a plain proxy query.
///
/// If the ECS answer contains any address matching the fallback ruleset the
/// name is domestic: it is re-resolved through `direct` and learned as
/// `direct_site`. Otherwise the proxy answer (or, failing that, the ECS
/// answer) is used and the name is learned as `proxy_site`.
pub(crate) async fn run(
    upstreams: Arc<dyn UpstreamDns>,
    rules: Arc<dyn IpRules>,
    categories: Arc<dyn CategoryStore>,
    fallback_rules: &[RuleToken],
    question: &Question,
    auto_categorize: bool,
) -> Result<DnsReply, DnsError> {
    let mut ecs_handle = {
        let upstreams = upstreams.clone();
        let question = question.clone();
        tokio::spawn(async move { upstreams.query(GROUP_PROXY_ECS, &question, None).await })
    };
    let mut proxy_handle = {
        let upstreams = upstreams.clone();
        let question = question.clone();
        tokio::spawn(async move { upstreams.query(GROUP_PROXY, &question, None).await })
    };

    let mut ecs_reply: Option<DnsReply> = None;
    let mut proxy_reply: Option<DnsReply> = None;

    let _ = tokio::time::timeout(RACE_TIMEOUT, async {
        tokio::join!(
            async {
                if let Ok(Ok(reply)) = (&mut ecs_handle).await {
                    ecs_reply = Some(reply);
                }
            },
            async {
                if let Ok(Ok(reply)) = (&mut proxy_handle).await {
                    proxy_reply = Some(reply);
                }
            },
        );
    })
    .await;

    // Advisory cancellation of whatever is still in flight.
    ecs_handle.abort();
    proxy_handle.abort();

    if let Some(ecs) = &ecs_reply {
        let domestic = ecs
            .addresses()
            .iter()
            .any(|ip| rules.match_any(*ip, fallback_rules));
        if domestic {
            debug!(question = %question, "ECS answer matches fallback ruleset, resolving via direct");
            learn(&categories, question, LEARNED_DIRECT, auto_categorize);
            return upstreams.query(GROUP_DIRECT, question, None).await;
        }
    }

    if let Some(reply) = proxy_reply {
        learn(&categories, question, LEARNED_PROXY, auto_categorize);
        return Ok(reply);
    }
    if let Some(reply) = ecs_reply {
        learn(&categories, question, LEARNED_PROXY, auto_categorize);
        return Ok(reply);
    }

    Err(DnsError::FallbackExhausted(question.name.to_string()))
}

/// Fire-and-forget category learning. Persistence failures are the store's
/// problem to log; the reply is never delayed by this write.
fn learn(categories: &Arc<dyn CategoryStore>, question: &Question, tag: &'static str, enabled: bool) {
    if !enabled {
        return;
    }
    let categories = categories.clone();
    let domain = strip_fqdn(&question.name).to_string();
    debug!(domain = %domain, category = tag, "Learning category");
    tokio::spawn(async move {
        categories.set(&domain, tag).await;
    });
}
