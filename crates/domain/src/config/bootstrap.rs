use serde::{Deserialize, Serialize};

/// Plain-IP resolvers used once at startup to resolve hostnames appearing in
/// upstream group nameservers. Never consulted while routing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub nameservers: Vec<String>,
    /// Seconds per bootstrap lookup.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            nameservers: Vec::new(),
            timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    3
}
