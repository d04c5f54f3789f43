use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

/// Resource records older than this are never served, regardless of the TTL
/// the upstream advertised.
pub const MAX_TTL_SECS: u32 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Ns,
    Soa,
    Ptr,
    Mx,
    Txt,
    Srv,
    Svcb,
    Https,
    Opt,
    Other(u16),
}

impl RecordType {
    pub fn to_u16(self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::Ns => 2,
            RecordType::Cname => 5,
            RecordType::Soa => 6,
            RecordType::Ptr => 12,
            RecordType::Mx => 15,
            RecordType::Txt => 16,
            RecordType::Aaaa => 28,
            RecordType::Srv => 33,
            RecordType::Opt => 41,
            RecordType::Svcb => 64,
            RecordType::Https => 65,
            RecordType::Other(code) => code,
        }
    }

    pub fn from_u16(code: u16) -> Self {
        match code {
            1 => RecordType::A,
            2 => RecordType::Ns,
            5 => RecordType::Cname,
            6 => RecordType::Soa,
            12 => RecordType::Ptr,
            15 => RecordType::Mx,
            16 => RecordType::Txt,
            28 => RecordType::Aaaa,
            33 => RecordType::Srv,
            41 => RecordType::Opt,
            64 => RecordType::Svcb,
            65 => RecordType::Https,
            other => RecordType::Other(other),
        }
    }

    pub fn is_address(self) -> bool {
        matches!(self, RecordType::A | RecordType::Aaaa)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::Aaaa => write!(f, "AAAA"),
            RecordType::Cname => write!(f, "CNAME"),
            RecordType::Ns => write!(f, "NS"),
            RecordType::Soa => write!(f, "SOA"),
            RecordType::Ptr => write!(f, "PTR"),
            RecordType::Mx => write!(f, "MX"),
            RecordType::Txt => write!(f, "TXT"),
            RecordType::Srv => write!(f, "SRV"),
            RecordType::Svcb => write!(f, "SVCB"),
            RecordType::Https => write!(f, "HTTPS"),
            RecordType::Opt => write!(f, "OPT"),
            RecordType::Other(code) => write!(f, "TYPE{}", code),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rcode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    Other(u16),
}

impl Rcode {
    pub fn to_u16(self) -> u16 {
        match self {
            Rcode::NoError => 0,
            Rcode::FormErr => 1,
            Rcode::ServFail => 2,
            Rcode::NxDomain => 3,
            Rcode::NotImp => 4,
            Rcode::Refused => 5,
            Rcode::Other(code) => code,
        }
    }

    pub fn from_u16(code: u16) -> Self {
        match code {
            0 => Rcode::NoError,
            1 => Rcode::FormErr,
            2 => Rcode::ServFail,
            3 => Rcode::NxDomain,
            4 => Rcode::NotImp,
            5 => Rcode::Refused,
            other => Rcode::Other(other),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rcode::NoError => "NOERROR",
            Rcode::FormErr => "FORMERR",
            Rcode::ServFail => "SERVFAIL",
            Rcode::NxDomain => "NXDOMAIN",
            Rcode::NotImp => "NOTIMP",
            Rcode::Refused => "REFUSED",
            Rcode::Other(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for Rcode {
    fn default() -> Self {
        Rcode::NoError
    }
}

/// Record payload. Only A/AAAA addresses and CNAME targets are ever
/// inspected; everything else rides through as opaque, uncompressed rdata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Cname(Arc<str>),
    Other(Vec<u8>),
}

/// A single DNS resource record. Immutable once constructed; the cache
/// rewrites the TTL on a copy at egress, never in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub name: Arc<str>,
    pub rtype: RecordType,
    pub class: u16,
    pub ttl: u32,
    pub data: RecordData,
}

impl ResourceRecord {
    pub fn address(&self) -> Option<IpAddr> {
        match &self.data {
            RecordData::A(ip) => Some(IpAddr::V4(*ip)),
            RecordData::Aaaa(ip) => Some(IpAddr::V6(*ip)),
            _ => None,
        }
    }

    pub fn cname_target(&self) -> Option<&str> {
        match &self.data {
            RecordData::Cname(target) => Some(target),
            _ => None,
        }
    }

    pub fn with_ttl(&self, ttl: u32) -> Self {
        let mut rr = self.clone();
        rr.ttl = ttl;
        rr
    }
}

/// A parsed DNS reply as the routing engine sees it.
#[derive(Debug, Clone, Default)]
pub struct DnsReply {
    pub rcode: Rcode,
    pub authenticated: bool,
    pub recursion_available: bool,
    pub truncated: bool,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

impl DnsReply {
    pub fn empty(rcode: Rcode) -> Self {
        Self {
            rcode,
            ..Self::default()
        }
    }

    /// All A/AAAA addresses in the answer section.
    pub fn addresses(&self) -> Vec<IpAddr> {
        self.answers.iter().filter_map(|rr| rr.address()).collect()
    }
}

/// One cached resource record together with the response metadata it arrived
/// with. Every item stored under the same (name, type) key carries the same
/// rcode/AD/RA triple; a write replaces the whole key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedRecord {
    pub record: ResourceRecord,
    pub original_ttl: u32,
    /// Unix seconds at store time.
    pub stored_at: u64,
    pub rcode: Rcode,
    pub authenticated: bool,
    pub recursion_available: bool,
}

impl CachedRecord {
    pub fn new(record: ResourceRecord, stored_at: u64, rcode: Rcode, ad: bool, ra: bool) -> Self {
        let original_ttl = record.ttl.min(MAX_TTL_SECS);
        Self {
            record,
            original_ttl,
            stored_at,
            rcode,
            authenticated: ad,
            recursion_available: ra,
        }
    }

    pub fn expires_at(&self) -> u64 {
        self.stored_at + u64::from(self.original_ttl)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at()
    }

    pub fn remaining_ttl(&self, now: u64) -> u32 {
        self.expires_at().saturating_sub(now) as u32
    }

    /// The stored record with its TTL rewritten to the seconds left.
    pub fn egress_record(&self, now: u64) -> ResourceRecord {
        self.record.with_ttl(self.remaining_ttl(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a_record(name: &str, ttl: u32) -> ResourceRecord {
        ResourceRecord {
            name: Arc::from(name),
            rtype: RecordType::A,
            class: 1,
            ttl,
            data: RecordData::A(Ipv4Addr::new(1, 2, 3, 4)),
        }
    }

    #[test]
    fn record_type_round_trip() {
        for code in [1u16, 2, 5, 6, 12, 15, 16, 28, 33, 41, 64, 65, 99, 257] {
            assert_eq!(RecordType::from_u16(code).to_u16(), code);
        }
    }

    #[test]
    fn rcode_round_trip() {
        for code in [0u16, 1, 2, 3, 4, 5, 16] {
            assert_eq!(Rcode::from_u16(code).to_u16(), code);
        }
    }

    #[test]
    fn cached_record_clamps_ttl() {
        let item = CachedRecord::new(a_record("a.test.", 500_000), 100, Rcode::NoError, false, true);
        assert_eq!(item.original_ttl, MAX_TTL_SECS);
    }

    #[test]
    fn remaining_ttl_counts_down() {
        let item = CachedRecord::new(a_record("a.test.", 300), 1_000, Rcode::NoError, false, true);
        assert_eq!(item.remaining_ttl(1_100), 200);
        assert!(!item.is_expired(1_299));
        assert!(item.is_expired(1_300));
        assert_eq!(item.remaining_ttl(2_000), 0);
    }

    #[test]
    fn egress_rewrites_ttl_only() {
        let item = CachedRecord::new(a_record("a.test.", 300), 1_000, Rcode::NoError, false, true);
        let out = item.egress_record(1_100);
        assert_eq!(out.ttl, 200);
        assert_eq!(out.data, item.record.data);
        assert_eq!(item.record.ttl, 300);
    }

    #[test]
    fn reply_addresses_skip_non_address_records() {
        let mut reply = DnsReply::empty(Rcode::NoError);
        reply.answers.push(a_record("a.test.", 60));
        reply.answers.push(ResourceRecord {
            name: Arc::from("a.test."),
            rtype: RecordType::Cname,
            class: 1,
            ttl: 60,
            data: RecordData::Cname(Arc::from("b.test.")),
        });
        assert_eq!(reply.addresses().len(), 1);
    }
}
