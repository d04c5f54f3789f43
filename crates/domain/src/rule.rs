use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// One IP-locality rule token from `expected_ips` or the global fallback
/// ruleset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleToken {
    /// `geoip:<cc>` — the address resolves to the given country.
    Geoip(Arc<str>),
    /// `geoip:!<cc>` — negation of the above.
    GeoipNot(Arc<str>),
    /// `geoip:private` — loopback, link-local, RFC1918 or ULA space.
    GeoipPrivate,
    /// `asn:<n>` — the address belongs to the given autonomous system.
    Asn(u32),
}

impl FromStr for RuleToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(country) = s.strip_prefix("geoip:") {
            if country.eq_ignore_ascii_case("private") {
                return Ok(RuleToken::GeoipPrivate);
            }
            let (negated, code) = match country.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, country),
            };
            if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(format!("Invalid country code in rule '{}'", s));
            }
            let code: Arc<str> = code.to_ascii_lowercase().into();
            return Ok(if negated {
                RuleToken::GeoipNot(code)
            } else {
                RuleToken::Geoip(code)
            });
        }
        if let Some(number) = s.strip_prefix("asn:") {
            let asn = number
                .parse::<u32>()
                .map_err(|_| format!("Invalid ASN number in rule '{}'", s))?;
            return Ok(RuleToken::Asn(asn));
        }
        Err(format!(
            "Invalid rule '{}'. Expected geoip:<cc>, geoip:!<cc>, geoip:private, or asn:<n>",
            s
        ))
    }
}

impl fmt::Display for RuleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleToken::Geoip(cc) => write!(f, "geoip:{}", cc),
            RuleToken::GeoipNot(cc) => write!(f, "geoip:!{}", cc),
            RuleToken::GeoipPrivate => write!(f, "geoip:private"),
            RuleToken::Asn(n) => write!(f, "asn:{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_kinds() {
        assert_eq!(
            "geoip:cn".parse::<RuleToken>().unwrap(),
            RuleToken::Geoip(Arc::from("cn"))
        );
        assert_eq!(
            "geoip:!CN".parse::<RuleToken>().unwrap(),
            RuleToken::GeoipNot(Arc::from("cn"))
        );
        assert_eq!(
            "geoip:private".parse::<RuleToken>().unwrap(),
            RuleToken::GeoipPrivate
        );
        assert_eq!("asn:4134".parse::<RuleToken>().unwrap(), RuleToken::Asn(4134));
    }

    #[test]
    fn country_codes_are_case_insensitive() {
        assert_eq!(
            "geoip:US".parse::<RuleToken>().unwrap(),
            RuleToken::Geoip(Arc::from("us"))
        );
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!("geoip:".parse::<RuleToken>().is_err());
        assert!("geoip:chn".parse::<RuleToken>().is_err());
        assert!("asn:x".parse::<RuleToken>().is_err());
        assert!("cidr:10.0.0.0/8".parse::<RuleToken>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for s in ["geoip:cn", "geoip:!cn", "geoip:private", "asn:4134"] {
            assert_eq!(s.parse::<RuleToken>().unwrap().to_string(), s);
        }
    }
}
