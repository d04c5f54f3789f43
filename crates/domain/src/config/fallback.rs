use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FallbackConfig {
    /// Country database: local path or http(s) URL.
    #[serde(default)]
    pub geoip: String,
    /// ASN database: local path or http(s) URL.
    #[serde(default)]
    pub asn: String,
    /// Cron expression for database refresh; empty disables.
    #[serde(default)]
    pub update: String,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Rule tokens that classify an ECS-enriched answer as "domestic".
    #[serde(default)]
    pub rule: Vec<String>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            geoip: String::new(),
            asn: String::new(),
            update: String::new(),
            strategy: default_strategy(),
            rule: Vec::new(),
        }
    }
}

fn default_strategy() -> String {
    "race".to_string()
}
