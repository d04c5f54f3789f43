use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DnsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid DNS message: {0}")]
    InvalidMessage(String),

    #[error("Transport error for {server}: {reason}")]
    Transport { server: String, reason: String },

    #[error("Transport timeout connecting to {server}")]
    TransportTimeout { server: String },

    #[error("All nameservers in group '{group}' failed: {last_error}")]
    UpstreamAllFailed { group: String, last_error: String },

    #[error("Upstream group not found: {0}")]
    UnknownGroup(String),

    #[error("All fallback queries failed for {0}")]
    FallbackExhausted(String),

    #[error("Cache backend error: {0}")]
    CacheBackend(String),

    #[error("Query timeout")]
    QueryTimeout,

    #[error("I/O error: {0}")]
    Io(String),
}

impl DnsError {
    /// True for per-nameserver failures the group race swallows as long as a
    /// sibling still succeeds.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DnsError::Transport { .. } | DnsError::TransportTimeout { .. } | DnsError::Io(_)
        )
    }
}
