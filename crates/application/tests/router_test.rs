mod helpers;

use helpers::mocks::{
    a_record, cname_record, now_unix, reply_with, MockCache, MockCategoryStore, MockIpRules,
    MockUpstream,
};
use janus_dns_application::ports::CategoryStore;
use janus_dns_application::QueryRouter;
use janus_dns_domain::{
    BlockAction, CachedRecord, PolicyOptions, PolicyTarget, Question, QueryPolicy, Rcode,
    RecordType, RuleToken,
};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    cache: Arc<MockCache>,
    store: Arc<MockCategoryStore>,
    upstream: Arc<MockUpstream>,
    router: QueryRouter,
}

fn policy(name: &str, group: &str, options: PolicyOptions) -> QueryPolicy {
    QueryPolicy {
        name: Arc::from(name),
        target: PolicyTarget::parse(group),
        options,
    }
}

fn harness(
    categories: &[(&str, &str)],
    countries: &[(&str, &str)],
    policies: Vec<QueryPolicy>,
    fallback_rules: Vec<RuleToken>,
) -> Harness {
    let cache = Arc::new(MockCache::default());
    let store = Arc::new(MockCategoryStore::with_entries(categories));
    let rules = Arc::new(MockIpRules::with_countries(countries));
    let upstream = Arc::new(MockUpstream::default());
    let router = QueryRouter::new(
        cache.clone(),
        true,
        store.clone(),
        rules,
        upstream.clone(),
        policies,
        fallback_rules,
    );
    Harness {
        cache,
        store,
        upstream,
        router,
    }
}

fn cached(record: janus_dns_domain::ResourceRecord, stored_at: u64) -> CachedRecord {
    CachedRecord::new(record, stored_at, Rcode::NoError, false, true)
}

async fn drain_learning() {
    // Category learning is fire-and-forget; give the spawned task a moment.
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn blocked_category_answers_nxdomain_without_upstream() {
    let h = harness(
        &[("doubleclick.net", "ads")],
        &[],
        vec![
            policy(
                "ads",
                "block",
                PolicyOptions {
                    block_action: BlockAction::NxDomain,
                    ..PolicyOptions::default()
                },
            ),
            policy("unknown", "proxy_ecs_fallback", PolicyOptions::default()),
        ],
        vec![],
    );

    let reply = h
        .router
        .route(&Question::new("doubleclick.net.", RecordType::A))
        .await
        .unwrap();

    assert_eq!(reply.rcode, Rcode::NxDomain);
    assert!(reply.answers.is_empty());
    assert!(h.upstream.calls().is_empty(), "block must not touch upstream");
}

#[tokio::test]
async fn fresh_cache_hit_serves_decremented_ttl() {
    let h = harness(
        &[("example.com", "cn_site")],
        &[],
        vec![policy("cn_site", "direct", PolicyOptions::default())],
        vec![],
    );

    // An answer cached 100 seconds ago with TTL 300.
    h.cache.preload(
        "example.com.",
        RecordType::A,
        vec![cached(
            a_record("example.com.", 300, "93.184.216.34"),
            now_unix() - 100,
        )],
    );

    let reply = h
        .router
        .route(&Question::new("example.com.", RecordType::A))
        .await
        .unwrap();

    assert_eq!(reply.answers.len(), 1);
    let ttl = reply.answers[0].ttl;
    assert!((199..=200).contains(&ttl), "expected ~200, got {}", ttl);
    assert!(h.upstream.calls().is_empty(), "cache hit must not touch upstream");
}

#[tokio::test]
async fn partial_cname_chain_queries_only_the_pivot() {
    let h = harness(
        &[("a.test", "cn_site")],
        &[],
        vec![policy("cn_site", "direct", PolicyOptions::default())],
        vec![],
    );

    let now = now_unix();
    h.cache.preload(
        "a.test.",
        RecordType::Cname,
        vec![cached(cname_record("a.test.", "b.test.", 600), now)],
    );
    h.cache.preload(
        "b.test.",
        RecordType::Cname,
        vec![cached(cname_record("b.test.", "c.test.", 600), now)],
    );
    h.upstream
        .answer("direct", reply_with(vec![a_record("c.test.", 300, "1.2.3.4")]));

    let reply = h
        .router
        .route(&Question::new("a.test.", RecordType::A))
        .await
        .unwrap();

    let calls = h.upstream.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "direct");
    assert_eq!(calls[0].1.name.as_ref(), "c.test.");
    assert_eq!(calls[0].1.rtype, RecordType::A);

    let names: Vec<&str> = reply.answers.iter().map(|rr| rr.name.as_ref()).collect();
    assert_eq!(names, ["a.test.", "b.test.", "c.test."]);
    assert_eq!(reply.answers[2].address().unwrap().to_string(), "1.2.3.4");
}

#[tokio::test]
async fn expected_ips_mismatch_uses_fallback_group_as_final() {
    let h = harness(
        &[("shop.cn", "cn_site")],
        &[("114.114.114.114", "cn")],
        vec![policy(
            "cn_site",
            "proxy",
            PolicyOptions {
                expected_ips: vec!["geoip:cn".parse().unwrap()],
                fallback_group: Some(Arc::from("direct")),
                ..PolicyOptions::default()
            },
        )],
        vec![],
    );

    h.upstream
        .answer("proxy", reply_with(vec![a_record("shop.cn.", 60, "8.8.8.8")]));
    h.upstream
        .answer("direct", reply_with(vec![a_record("shop.cn.", 60, "1.1.1.1")]));

    let reply = h
        .router
        .route(&Question::new("shop.cn.", RecordType::A))
        .await
        .unwrap();

    // The fallback answer is final even though 1.1.1.1 is not geoip:cn.
    assert_eq!(reply.addresses()[0].to_string(), "1.1.1.1");

    let groups: Vec<String> = h.upstream.calls().into_iter().map(|(g, _, _)| g).collect();
    assert_eq!(groups, ["proxy", "direct"]);

    let stored = h.cache.stored("shop.cn.", RecordType::A).unwrap();
    assert_eq!(
        stored[0].record.address().unwrap().to_string(),
        "1.1.1.1",
        "cache must hold the fallback result"
    );
}

#[tokio::test]
async fn expected_ips_pass_with_cname_only_answer() {
    let h = harness(
        &[("alias.cn", "cn_site")],
        &[],
        vec![policy(
            "cn_site",
            "proxy",
            PolicyOptions {
                expected_ips: vec!["geoip:cn".parse().unwrap()],
                fallback_group: Some(Arc::from("direct")),
                ..PolicyOptions::default()
            },
        )],
        vec![],
    );

    h.upstream.answer(
        "proxy",
        reply_with(vec![cname_record("alias.cn.", "target.cn.", 60)]),
    );

    let reply = h
        .router
        .route(&Question::new("alias.cn.", RecordType::A))
        .await
        .unwrap();

    assert_eq!(reply.answers.len(), 1);
    let groups: Vec<String> = h.upstream.calls().into_iter().map(|(g, _, _)| g).collect();
    assert_eq!(groups, ["proxy"], "no-address answers pass validation");
}

#[tokio::test]
async fn expected_ips_mismatch_without_fallback_escalates_to_ecs_race() {
    let h = harness(
        &[("cdn.example", "cn_site")],
        &[("114.114.114.114", "cn")],
        vec![policy(
            "cn_site",
            "proxy",
            PolicyOptions {
                expected_ips: vec!["geoip:cn".parse().unwrap()],
                ..PolicyOptions::default()
            },
        )],
        vec![RuleToken::Geoip(Arc::from("cn"))],
    );

    h.upstream
        .answer("proxy", reply_with(vec![a_record("cdn.example.", 60, "8.8.8.8")]));
    h.upstream.answer(
        "proxy_ecs",
        reply_with(vec![a_record("cdn.example.", 60, "142.250.0.1")]),
    );

    let reply = h
        .router
        .route(&Question::new("cdn.example.", RecordType::A))
        .await
        .unwrap();

    // proxy answer wins the race; the original (discarded) proxy response is
    // requeried as part of the escalation.
    assert_eq!(reply.addresses()[0].to_string(), "8.8.8.8");
    let groups: Vec<String> = h.upstream.calls().into_iter().map(|(g, _, _)| g).collect();
    assert!(groups.contains(&"proxy_ecs".to_string()));
}

#[tokio::test]
async fn ecs_race_domestic_answer_switches_to_direct_and_learns() {
    let h = harness(
        &[],
        &[("114.114.110.1", "cn")],
        vec![policy("unknown", "proxy_ecs_fallback", PolicyOptions::default())],
        vec![RuleToken::Geoip(Arc::from("cn"))],
    );

    h.upstream.answer(
        "proxy_ecs",
        reply_with(vec![a_record("site.example.", 60, "114.114.110.1")]),
    );
    h.upstream.answer(
        "proxy",
        reply_with(vec![a_record("site.example.", 60, "8.8.8.8")]),
    );
    h.upstream.answer(
        "direct",
        reply_with(vec![a_record("site.example.", 60, "114.114.114.114")]),
    );

    let reply = h
        .router
        .route(&Question::new("site.example.", RecordType::A))
        .await
        .unwrap();

    assert_eq!(reply.addresses()[0].to_string(), "114.114.114.114");
    drain_learning().await;
    assert_eq!(h.store.lookup("site.example").as_deref(), Some("direct_site"));
}

#[tokio::test]
async fn ecs_race_foreign_answer_uses_proxy_and_never_queries_direct() {
    let h = harness(
        &[],
        &[("114.114.110.1", "cn")],
        vec![policy("unknown", "proxy_ecs_fallback", PolicyOptions::default())],
        vec![RuleToken::Geoip(Arc::from("cn"))],
    );

    h.upstream.answer(
        "proxy_ecs",
        reply_with(vec![a_record("site.example.", 60, "142.250.0.10")]),
    );
    h.upstream.answer(
        "proxy",
        reply_with(vec![a_record("site.example.", 60, "142.251.0.20")]),
    );

    let reply = h
        .router
        .route(&Question::new("site.example.", RecordType::A))
        .await
        .unwrap();

    assert_eq!(reply.addresses()[0].to_string(), "142.251.0.20");
    assert!(h.upstream.calls_to("direct").is_empty());
    drain_learning().await;
    assert_eq!(h.store.lookup("site.example").as_deref(), Some("proxy_site"));
}

#[tokio::test]
async fn ecs_race_falls_back_to_ecs_reply_when_proxy_fails() {
    let h = harness(
        &[],
        &[],
        vec![policy("unknown", "proxy_ecs_fallback", PolicyOptions::default())],
        vec![RuleToken::Geoip(Arc::from("cn"))],
    );

    h.upstream.answer(
        "proxy_ecs",
        reply_with(vec![a_record("site.example.", 60, "142.250.0.10")]),
    );
    h.upstream.fail("proxy");

    let reply = h
        .router
        .route(&Question::new("site.example.", RecordType::A))
        .await
        .unwrap();
    assert_eq!(reply.addresses()[0].to_string(), "142.250.0.10");
}

#[tokio::test]
async fn ecs_race_with_all_failures_errors_out() {
    let h = harness(
        &[],
        &[],
        vec![policy("unknown", "proxy_ecs_fallback", PolicyOptions::default())],
        vec![],
    );
    h.upstream.fail("proxy_ecs");
    h.upstream.fail("proxy");

    let result = h
        .router
        .route(&Question::new("site.example.", RecordType::A))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn learned_category_short_circuits_the_race() {
    let h = harness(
        &[],
        &[],
        vec![
            policy("direct_site", "direct", PolicyOptions::default()),
            policy("unknown", "proxy_ecs_fallback", PolicyOptions::default()),
        ],
        vec![RuleToken::Geoip(Arc::from("cn"))],
    );
    h.upstream.answer(
        "direct",
        reply_with(vec![a_record("site.example.", 60, "114.114.114.114")]),
    );

    // Simulate a previous ecs-fallback decision.
    h.store.set("site.example", "direct_site").await;

    h.router
        .route(&Question::new("site.example.", RecordType::A))
        .await
        .unwrap();

    let groups: Vec<String> = h.upstream.calls().into_iter().map(|(g, _, _)| g).collect();
    assert_eq!(groups, ["direct"]);
}

#[tokio::test]
async fn disable_ipv6_answers_empty_noerror() {
    let h = harness(
        &[("v4only.example", "cn_site")],
        &[],
        vec![policy(
            "cn_site",
            "direct",
            PolicyOptions {
                disable_ipv6: true,
                ..PolicyOptions::default()
            },
        )],
        vec![],
    );

    let reply = h
        .router
        .route(&Question::new("v4only.example.", RecordType::Aaaa))
        .await
        .unwrap();
    assert_eq!(reply.rcode, Rcode::NoError);
    assert!(reply.answers.is_empty());
    assert!(h.upstream.calls().is_empty());
}

#[tokio::test]
async fn disable_cache_skips_the_store() {
    let h = harness(
        &[("nocache.example", "cn_site")],
        &[],
        vec![policy(
            "cn_site",
            "direct",
            PolicyOptions {
                disable_cache: true,
                ..PolicyOptions::default()
            },
        )],
        vec![],
    );
    h.upstream.answer(
        "direct",
        reply_with(vec![a_record("nocache.example.", 60, "1.2.3.4")]),
    );

    h.router
        .route(&Question::new("nocache.example.", RecordType::A))
        .await
        .unwrap();

    assert!(h.cache.stored("nocache.example.", RecordType::A).is_none());
}

#[tokio::test]
async fn rewrite_ttl_applies_to_cached_records() {
    let h = harness(
        &[("pinned.example", "cn_site")],
        &[],
        vec![policy(
            "cn_site",
            "direct",
            PolicyOptions {
                rewrite_ttl: 15,
                ..PolicyOptions::default()
            },
        )],
        vec![],
    );
    h.upstream.answer(
        "direct",
        reply_with(vec![a_record("pinned.example.", 3600, "1.2.3.4")]),
    );

    h.router
        .route(&Question::new("pinned.example.", RecordType::A))
        .await
        .unwrap();

    let stored = h.cache.stored("pinned.example.", RecordType::A).unwrap();
    assert_eq!(stored[0].original_ttl, 15);
}

#[tokio::test]
async fn per_policy_ecs_override_reaches_the_upstream() {
    let h = harness(
        &[("tv.example", "cn_site")],
        &[],
        vec![policy(
            "cn_site",
            "proxy",
            PolicyOptions {
                ecs: Some(Arc::from("101.6.6.0/24")),
                ..PolicyOptions::default()
            },
        )],
        vec![],
    );
    h.upstream
        .answer("proxy", reply_with(vec![a_record("tv.example.", 60, "1.2.3.4")]));

    h.router
        .route(&Question::new("tv.example.", RecordType::A))
        .await
        .unwrap();

    let calls = h.upstream.calls();
    assert_eq!(calls[0].2.as_deref(), Some("101.6.6.0/24"));
}
