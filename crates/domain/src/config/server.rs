use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            protocol: default_protocol(),
        }
    }
}

fn default_port() -> u16 {
    53
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_protocol() -> String {
    "udp".to_string()
}
