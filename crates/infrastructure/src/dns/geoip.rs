use arc_swap::ArcSwap;
use janus_dns_application::ports::IpRules;
use janus_dns_domain::{DnsError, RuleToken};
use maxminddb::geoip2;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

type Reader = maxminddb::Reader<Vec<u8>>;

/// Country/ASN rule matcher over MaxMind-format databases.
///
/// Both readers are optional and hot-swappable; a missing database makes its
/// rule kind evaluate to false rather than erroring, so the resolver keeps
/// serving while files download or refresh.
pub struct GeoIpMatcher {
    country: ArcSwap<Option<Reader>>,
    asn: ArcSwap<Option<Reader>>,
}

impl GeoIpMatcher {
    pub fn empty() -> Self {
        Self {
            country: ArcSwap::from_pointee(None),
            asn: ArcSwap::from_pointee(None),
        }
    }

    pub fn load_country(&self, path: &Path) -> Result<(), DnsError> {
        let reader = maxminddb::Reader::open_readfile(path).map_err(|e| {
            DnsError::Config(format!("failed to open country database {:?}: {}", path, e))
        })?;
        info!(path = %path.display(), "Country database loaded");
        self.country.store(Arc::new(Some(reader)));
        Ok(())
    }

    pub fn load_asn(&self, path: &Path) -> Result<(), DnsError> {
        let reader = maxminddb::Reader::open_readfile(path).map_err(|e| {
            DnsError::Config(format!("failed to open ASN database {:?}: {}", path, e))
        })?;
        info!(path = %path.display(), "ASN database loaded");
        self.asn.store(Arc::new(Some(reader)));
        Ok(())
    }

    /// ISO country code for an address, lowercased.
    pub fn country(&self, ip: IpAddr) -> Option<String> {
        let guard = self.country.load();
        let reader = guard.as_ref().as_ref()?;
        let record: geoip2::Country = reader.lookup(ip).ok()?;
        record
            .country
            .and_then(|c| c.iso_code)
            .map(|code| code.to_ascii_lowercase())
    }

    /// Autonomous system number and organization for an address.
    pub fn asn(&self, ip: IpAddr) -> Option<(u32, String)> {
        let guard = self.asn.load();
        let reader = guard.as_ref().as_ref()?;
        let record: geoip2::Asn = reader.lookup(ip).ok()?;
        let number = record.autonomous_system_number?;
        let org = record
            .autonomous_system_organization
            .unwrap_or_default()
            .to_string();
        Some((number, org))
    }

    fn matches_country(&self, ip: IpAddr, code: &str) -> bool {
        match self.country(ip) {
            Some(found) => found == code,
            None => false,
        }
    }
}

/// Loopback, link-local, RFC1918, or ULA space.
fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_link_local() || v4.is_private(),
        IpAddr::V6(v6) => {
            if v6.is_loopback() {
                return true;
            }
            let seg = v6.segments();
            // fe80::/10 link-local, fc00::/7 unique-local
            (seg[0] & 0xffc0) == 0xfe80 || (seg[0] & 0xfe00) == 0xfc00
        }
    }
}

impl IpRules for GeoIpMatcher {
    fn matches(&self, ip: IpAddr, rule: &RuleToken) -> bool {
        let matched = match rule {
            RuleToken::Geoip(code) => self.matches_country(ip, code),
            RuleToken::GeoipNot(code) => !self.matches_country(ip, code),
            RuleToken::GeoipPrivate => is_private(ip),
            RuleToken::Asn(number) => self
                .asn(ip)
                .map(|(found, _)| found == *number)
                .unwrap_or(false),
        };
        debug!(ip = %ip, rule = %rule, matched, "Rule evaluated");
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> GeoIpMatcher {
        GeoIpMatcher::empty()
    }

    #[test]
    fn private_space_detection() {
        for ip in ["127.0.0.1", "10.1.2.3", "172.16.0.1", "192.168.1.1", "169.254.0.1"] {
            assert!(
                matcher().matches(ip.parse().unwrap(), &RuleToken::GeoipPrivate),
                "{} should be private",
                ip
            );
        }
        for ip in ["::1", "fe80::1", "fd00::1"] {
            assert!(
                matcher().matches(ip.parse().unwrap(), &RuleToken::GeoipPrivate),
                "{} should be private",
                ip
            );
        }
        for ip in ["8.8.8.8", "1.1.1.1", "2001:4860:4860::8888"] {
            assert!(
                !matcher().matches(ip.parse().unwrap(), &RuleToken::GeoipPrivate),
                "{} should not be private",
                ip
            );
        }
    }

    #[test]
    fn absent_database_never_matches_positive_rules() {
        let m = matcher();
        let ip: IpAddr = "8.8.8.8".parse().unwrap();
        assert!(!m.matches(ip, &RuleToken::Geoip(Arc::from("cn"))));
        assert!(!m.matches(ip, &RuleToken::Asn(15169)));
    }

    #[test]
    fn negated_country_matches_when_database_is_absent() {
        // geoip:!cn is the boolean negation, so an unknown country matches.
        let m = matcher();
        let ip: IpAddr = "8.8.8.8".parse().unwrap();
        assert!(m.matches(ip, &RuleToken::GeoipNot(Arc::from("cn"))));
    }

    #[test]
    fn match_any_is_an_or() {
        let m = matcher();
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let rules = vec![
            RuleToken::Geoip(Arc::from("cn")),
            RuleToken::GeoipPrivate,
        ];
        assert!(m.match_any(ip, &rules));
        assert!(!m.match_any(ip, &rules[..1]));
    }
}
