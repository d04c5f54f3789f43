use janus_dns_domain::RuleToken;
use std::net::IpAddr;

/// IP-locality rule evaluation against the country/ASN databases.
///
/// An absent database makes the affected rule kind evaluate to `false`;
/// evaluation never errors.
pub trait IpRules: Send + Sync {
    fn matches(&self, ip: IpAddr, rule: &RuleToken) -> bool;

    /// True iff at least one rule matches.
    fn match_any(&self, ip: IpAddr, rules: &[RuleToken]) -> bool {
        rules.iter().any(|rule| self.matches(ip, rule))
    }
}
