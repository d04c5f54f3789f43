use crate::record::RecordType;
use std::fmt;
use std::sync::Arc;

/// Normalize a domain name to the canonical cache/classifier form:
/// lowercase, fully qualified with a trailing dot.
pub fn normalize_name(name: &str) -> Arc<str> {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with('.') {
        Arc::from(lower)
    } else {
        Arc::from(format!("{}.", lower))
    }
}

/// Strip the trailing dot for classifier lookups, which key on bare labels.
pub fn strip_fqdn(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// A parsed DNS question. The class is always IN; the name is stored in
/// normalized form (see [`normalize_name`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Question {
    pub name: Arc<str>,
    pub rtype: RecordType,
}

impl Question {
    pub fn new(name: &str, rtype: RecordType) -> Self {
        Self {
            name: normalize_name(name),
            rtype,
        }
    }

    /// Same question asked for a different owner name (the CNAME-chain pivot).
    pub fn with_name(&self, name: &str) -> Self {
        Self {
            name: normalize_name(name),
            rtype: self.rtype,
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.rtype)
    }
}
