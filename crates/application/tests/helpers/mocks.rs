use async_trait::async_trait;
use dashmap::DashMap;
use janus_dns_application::ports::{CategoryStore, IpRules, RecordCache, UpstreamDns};
use janus_dns_domain::{
    CachedRecord, DnsError, DnsReply, Question, Rcode, RecordData, RecordType, ResourceRecord,
    RuleToken,
};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

pub fn a_record(name: &str, ttl: u32, ip: &str) -> ResourceRecord {
    ResourceRecord {
        name: Arc::from(name),
        rtype: RecordType::A,
        class: 1,
        ttl,
        data: RecordData::A(ip.parse().unwrap()),
    }
}

pub fn cname_record(name: &str, target: &str, ttl: u32) -> ResourceRecord {
    ResourceRecord {
        name: Arc::from(name),
        rtype: RecordType::Cname,
        class: 1,
        ttl,
        data: RecordData::Cname(Arc::from(target)),
    }
}

pub fn reply_with(answers: Vec<ResourceRecord>) -> DnsReply {
    DnsReply {
        rcode: Rcode::NoError,
        recursion_available: true,
        answers,
        ..DnsReply::default()
    }
}

/// In-memory record cache honoring expiry against the real clock.
#[derive(Default)]
pub struct MockCache {
    entries: DashMap<(String, u16), Vec<CachedRecord>>,
}

impl MockCache {
    pub fn preload(&self, name: &str, rtype: RecordType, items: Vec<CachedRecord>) {
        self.entries.insert((name.to_string(), rtype.to_u16()), items);
    }

    pub fn stored(&self, name: &str, rtype: RecordType) -> Option<Vec<CachedRecord>> {
        self.entries
            .get(&(name.to_string(), rtype.to_u16()))
            .map(|items| items.clone())
    }
}

#[async_trait]
impl RecordCache for MockCache {
    async fn get(&self, name: &str, rtype: RecordType) -> Option<Vec<CachedRecord>> {
        let key = (name.to_string(), rtype.to_u16());
        let now = now_unix();
        let valid: Vec<CachedRecord> = self
            .entries
            .get(&key)?
            .iter()
            .filter(|item| !item.is_expired(now))
            .cloned()
            .collect();
        if valid.is_empty() {
            self.entries.remove(&key);
            return None;
        }
        Some(valid)
    }

    async fn set(&self, name: &str, rtype: RecordType, items: Vec<CachedRecord>) {
        self.entries.insert((name.to_string(), rtype.to_u16()), items);
    }

    async fn delete(&self, name: &str, rtype: RecordType) {
        self.entries.remove(&(name.to_string(), rtype.to_u16()));
    }

    async fn clear(&self) {
        self.entries.clear();
    }
}

#[derive(Default)]
pub struct MockCategoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MockCategoryStore {
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        let store = Self::default();
        {
            let mut map = store.entries.lock().unwrap();
            for (domain, tag) in entries {
                map.insert(domain.to_string(), tag.to_string());
            }
        }
        store
    }

    pub fn lookup(&self, domain: &str) -> Option<String> {
        self.entries.lock().unwrap().get(domain).cloned()
    }
}

#[async_trait]
impl CategoryStore for MockCategoryStore {
    async fn get(&self, domain: &str) -> Option<Arc<str>> {
        self.entries
            .lock()
            .unwrap()
            .get(domain)
            .map(|tag| Arc::from(tag.as_str()))
    }

    async fn set(&self, domain: &str, category: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(domain.to_string(), category.to_string());
    }

    async fn bulk_set(&self, entries: HashMap<String, String>) {
        self.entries.lock().unwrap().extend(entries);
    }

    async fn delete(&self, domain: &str) {
        self.entries.lock().unwrap().remove(domain);
    }

    async fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Country lookup backed by a fixed IP → country map; ASN rules never match.
#[derive(Default)]
pub struct MockIpRules {
    countries: HashMap<IpAddr, String>,
}

impl MockIpRules {
    pub fn with_countries(entries: &[(&str, &str)]) -> Self {
        let mut countries = HashMap::new();
        for (ip, cc) in entries {
            countries.insert(ip.parse().unwrap(), cc.to_string());
        }
        Self { countries }
    }
}

impl IpRules for MockIpRules {
    fn matches(&self, ip: IpAddr, rule: &RuleToken) -> bool {
        match rule {
            RuleToken::Geoip(cc) => self
                .countries
                .get(&ip)
                .map(|found| found == cc.as_ref())
                .unwrap_or(false),
            RuleToken::GeoipNot(cc) => !self.matches(ip, &RuleToken::Geoip(cc.clone())),
            RuleToken::GeoipPrivate => match ip {
                IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
                IpAddr::V6(v6) => v6.is_loopback(),
            },
            RuleToken::Asn(_) => false,
        }
    }
}

/// Scripted upstream manager recording every query it receives.
#[derive(Default)]
pub struct MockUpstream {
    replies: Mutex<HashMap<String, Result<DnsReply, DnsError>>>,
    calls: Mutex<Vec<(String, Question, Option<String>)>>,
}

impl MockUpstream {
    pub fn answer(&self, group: &str, reply: DnsReply) {
        self.replies
            .lock()
            .unwrap()
            .insert(group.to_string(), Ok(reply));
    }

    pub fn fail(&self, group: &str) {
        self.replies.lock().unwrap().insert(
            group.to_string(),
            Err(DnsError::UpstreamAllFailed {
                group: group.to_string(),
                last_error: "scripted failure".to_string(),
            }),
        );
    }

    pub fn calls(&self) -> Vec<(String, Question, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, group: &str) -> Vec<Question> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(g, _, _)| g == group)
            .map(|(_, q, _)| q.clone())
            .collect()
    }
}

#[async_trait]
impl UpstreamDns for MockUpstream {
    async fn query(
        &self,
        group: &str,
        question: &Question,
        ecs_override: Option<&str>,
    ) -> Result<DnsReply, DnsError> {
        self.calls.lock().unwrap().push((
            group.to_string(),
            question.clone(),
            ecs_override.map(str::to_string),
        ));
        match self.replies.lock().unwrap().get(group) {
            Some(result) => result.clone(),
            None => Err(DnsError::UnknownGroup(group.to_string())),
        }
    }
}
