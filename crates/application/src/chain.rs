use crate::ports::RecordCache;
use janus_dns_domain::{
    normalize_name, CachedRecord, DnsReply, Question, Rcode, RecordType, ResourceRecord,
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// CNAME chains longer than this are handed to the upstream as-is.
pub const MAX_CHAIN_DEPTH: usize = 10;

pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Outcome of walking the cached CNAME chain for a question.
#[derive(Debug)]
pub struct ChainResolution {
    /// Records collected so far, TTLs already rewritten to remaining seconds.
    pub collected: Vec<ResourceRecord>,
    /// True when the caller still has to ask an upstream.
    pub need_upstream: bool,
    /// The name the upstream must be asked for. Meaningful only when
    /// `need_upstream` is true.
    pub pivot: Arc<str>,
    /// rcode/AD/RA of the terminal cache hit, for synthesizing a reply.
    pub rcode: Rcode,
    pub authenticated: bool,
    pub recursion_available: bool,
}

impl ChainResolution {
    /// A reply built entirely from cache.
    pub fn into_reply(self) -> DnsReply {
        DnsReply {
            rcode: self.rcode,
            authenticated: self.authenticated,
            recursion_available: self.recursion_available,
            truncated: false,
            answers: self.collected,
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }
}

/// Walk the cache from `question.name`, following cached CNAMEs, until the
/// target type is found or a link is missing. On a missing link the returned
/// pivot is the name the upstream must answer.
pub async fn resolve_chain(
    cache: &dyn RecordCache,
    question: &Question,
    now: u64,
) -> ChainResolution {
    let mut collected = Vec::new();
    let mut current: Arc<str> = question.name.clone();

    for _ in 0..MAX_CHAIN_DEPTH {
        if let Some(items) = cache.get(&current, question.rtype).await {
            let meta = items[0].clone();
            collected.extend(items.iter().map(|item| item.egress_record(now)));
            return ChainResolution {
                collected,
                need_upstream: false,
                pivot: Arc::from(""),
                rcode: meta.rcode,
                authenticated: meta.authenticated,
                recursion_available: meta.recursion_available,
            };
        }

        let Some(cnames) = cache.get(&current, RecordType::Cname).await else {
            return ChainResolution {
                collected,
                need_upstream: true,
                pivot: current,
                rcode: Rcode::NoError,
                authenticated: false,
                recursion_available: false,
            };
        };

        for item in &cnames {
            collected.push(item.egress_record(now));
            if let Some(target) = item.record.cname_target() {
                current = normalize_name(target);
            }
        }
    }

    ChainResolution {
        collected,
        need_upstream: true,
        pivot: current,
        rcode: Rcode::NoError,
        authenticated: false,
        recursion_available: false,
    }
}

/// The merged reply for a partially cached chain: collected records first,
/// then the upstream answer; rcode/AD/RA copied from the upstream, other
/// flags cleared.
pub fn merge_reply(collected: Vec<ResourceRecord>, upstream: DnsReply) -> DnsReply {
    let mut answers = collected;
    answers.extend(upstream.answers);
    DnsReply {
        rcode: upstream.rcode,
        authenticated: upstream.authenticated,
        recursion_available: upstream.recursion_available,
        truncated: false,
        answers,
        authority: upstream.authority,
        additional: upstream.additional,
    }
}

/// Cache a reply's answer section, one `set` per (owner name, type) group.
/// Authority and Additional sections are never cached. A non-zero
/// `rewrite_ttl` replaces every record's TTL before storing.
pub async fn store_response(cache: &dyn RecordCache, reply: &DnsReply, rewrite_ttl: u32, now: u64) {
    let mut groups: Vec<((Arc<str>, RecordType), Vec<CachedRecord>)> = Vec::new();

    for record in &reply.answers {
        let stored = if rewrite_ttl > 0 {
            record.with_ttl(rewrite_ttl)
        } else {
            record.clone()
        };
        let item = CachedRecord::new(
            stored,
            now,
            reply.rcode,
            reply.authenticated,
            reply.recursion_available,
        );
        let key = (record.name.clone(), record.rtype);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, items)) => items.push(item),
            None => groups.push((key, vec![item])),
        }
    }

    for ((name, rtype), items) in groups {
        cache.set(&name, rtype, items).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dashmap::DashMap;
    use janus_dns_domain::RecordData;
    use std::net::Ipv4Addr;

    #[derive(Default)]
    struct MapCache {
        entries: DashMap<(String, u16), Vec<CachedRecord>>,
    }

    #[async_trait]
    impl RecordCache for MapCache {
        async fn get(&self, name: &str, rtype: RecordType) -> Option<Vec<CachedRecord>> {
            self.entries
                .get(&(name.to_string(), rtype.to_u16()))
                .map(|items| items.clone())
        }

        async fn set(&self, name: &str, rtype: RecordType, items: Vec<CachedRecord>) {
            self.entries
                .insert((name.to_string(), rtype.to_u16()), items);
        }

        async fn delete(&self, name: &str, rtype: RecordType) {
            self.entries.remove(&(name.to_string(), rtype.to_u16()));
        }

        async fn clear(&self) {
            self.entries.clear();
        }
    }

    fn cname(name: &str, target: &str, ttl: u32) -> ResourceRecord {
        ResourceRecord {
            name: Arc::from(name),
            rtype: RecordType::Cname,
            class: 1,
            ttl,
            data: RecordData::Cname(Arc::from(target)),
        }
    }

    fn a_record(name: &str, ttl: u32, ip: [u8; 4]) -> ResourceRecord {
        ResourceRecord {
            name: Arc::from(name),
            rtype: RecordType::A,
            class: 1,
            ttl,
            data: RecordData::A(Ipv4Addr::from(ip)),
        }
    }

    fn cached(record: ResourceRecord, stored_at: u64) -> CachedRecord {
        CachedRecord::new(record, stored_at, Rcode::NoError, false, true)
    }

    #[tokio::test]
    async fn full_hit_returns_reply_without_upstream() {
        let cache = MapCache::default();
        cache
            .set(
                "a.test.",
                RecordType::A,
                vec![cached(a_record("a.test.", 300, [1, 2, 3, 4]), 1_000)],
            )
            .await;

        let question = Question::new("a.test.", RecordType::A);
        let resolution = resolve_chain(&cache, &question, 1_100).await;
        assert!(!resolution.need_upstream);
        assert_eq!(resolution.collected.len(), 1);
        assert_eq!(resolution.collected[0].ttl, 200);
    }

    #[tokio::test]
    async fn partial_chain_reports_pivot() {
        let cache = MapCache::default();
        cache
            .set(
                "a.test.",
                RecordType::Cname,
                vec![cached(cname("a.test.", "b.test.", 600), 0)],
            )
            .await;
        cache
            .set(
                "b.test.",
                RecordType::Cname,
                vec![cached(cname("b.test.", "c.test.", 600), 0)],
            )
            .await;

        let question = Question::new("a.test.", RecordType::A);
        let resolution = resolve_chain(&cache, &question, 0).await;
        assert!(resolution.need_upstream);
        assert_eq!(resolution.pivot.as_ref(), "c.test.");
        assert_eq!(resolution.collected.len(), 2);
        assert_eq!(resolution.collected[0].name.as_ref(), "a.test.");
        assert_eq!(resolution.collected[1].name.as_ref(), "b.test.");
    }

    #[tokio::test]
    async fn chain_terminating_in_addresses_is_fully_served() {
        let cache = MapCache::default();
        cache
            .set(
                "a.test.",
                RecordType::Cname,
                vec![cached(cname("a.test.", "b.test.", 600), 0)],
            )
            .await;
        cache
            .set(
                "b.test.",
                RecordType::A,
                vec![cached(a_record("b.test.", 300, [5, 6, 7, 8]), 0)],
            )
            .await;

        let question = Question::new("a.test.", RecordType::A);
        let resolution = resolve_chain(&cache, &question, 0).await;
        assert!(!resolution.need_upstream);
        let reply = resolution.into_reply();
        assert_eq!(reply.answers.len(), 2);
        assert_eq!(reply.answers[1].address().unwrap().to_string(), "5.6.7.8");
    }

    #[tokio::test]
    async fn depth_limit_stops_loops() {
        let cache = MapCache::default();
        cache
            .set(
                "loop.test.",
                RecordType::Cname,
                vec![cached(cname("loop.test.", "loop.test.", 600), 0)],
            )
            .await;

        let question = Question::new("loop.test.", RecordType::A);
        let resolution = resolve_chain(&cache, &question, 0).await;
        assert!(resolution.need_upstream);
        assert_eq!(resolution.collected.len(), MAX_CHAIN_DEPTH);
    }

    #[tokio::test]
    async fn store_response_groups_by_owner_and_type() {
        let cache = MapCache::default();
        let reply = DnsReply {
            rcode: Rcode::NoError,
            recursion_available: true,
            answers: vec![
                cname("a.test.", "b.test.", 600),
                a_record("b.test.", 300, [1, 1, 1, 1]),
                a_record("b.test.", 300, [2, 2, 2, 2]),
            ],
            ..DnsReply::default()
        };

        store_response(&cache, &reply, 0, 50).await;

        let cnames = cache.get("a.test.", RecordType::Cname).await.unwrap();
        assert_eq!(cnames.len(), 1);
        let addresses = cache.get("b.test.", RecordType::A).await.unwrap();
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].stored_at, 50);
    }

    #[tokio::test]
    async fn store_response_rewrites_ttl() {
        let cache = MapCache::default();
        let reply = DnsReply {
            answers: vec![a_record("a.test.", 300, [1, 1, 1, 1])],
            ..DnsReply::default()
        };

        store_response(&cache, &reply, 30, 0).await;

        let items = cache.get("a.test.", RecordType::A).await.unwrap();
        assert_eq!(items[0].original_ttl, 30);
    }

    #[test]
    fn merge_copies_upstream_metadata() {
        let collected = vec![cname("a.test.", "b.test.", 600)];
        let upstream = DnsReply {
            rcode: Rcode::NoError,
            authenticated: true,
            recursion_available: true,
            truncated: true,
            answers: vec![a_record("b.test.", 60, [9, 9, 9, 9])],
            ..DnsReply::default()
        };

        let merged = merge_reply(collected, upstream);
        assert_eq!(merged.answers.len(), 2);
        assert!(merged.authenticated);
        assert!(!merged.truncated);
        assert_eq!(merged.answers[0].name.as_ref(), "a.test.");
    }
}
