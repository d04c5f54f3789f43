use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// "debug", "info", "warn" or "error".
    #[serde(default = "default_level")]
    pub level: String,
    /// "json" or "text".
    #[serde(default = "default_format")]
    pub format: String,
    /// "stdout" or a file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            output: default_output(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stdout".to_string()
}
