use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub dns_cache: DnsCacheConfig,
    #[serde(default)]
    pub category_cache: CategoryCacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DnsCacheConfig {
    #[serde(default = "default_true")]
    pub enable: bool,
    /// Wipe the backing store at startup.
    #[serde(default)]
    pub clear: bool,
    /// "memory" or "redis".
    #[serde(rename = "type", default = "default_backend")]
    pub backend: String,
}

impl Default for DnsCacheConfig {
    fn default() -> Self {
        Self {
            enable: true,
            clear: false,
            backend: default_backend(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryCacheConfig {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default)]
    pub clear: bool,
    #[serde(rename = "type", default = "default_backend")]
    pub backend: String,
    /// Per-entry TTL in seconds for the redis backend; 0 means no expiry.
    #[serde(default)]
    pub ttl: u64,
}

impl Default for CategoryCacheConfig {
    fn default() -> Self {
        Self {
            enable: true,
            clear: false,
            backend: default_backend(),
            ttl: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub server: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default)]
    pub database: u32,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: default_redis_port(),
            database: 0,
            password: String::new(),
            max_retries: default_max_retries(),
            pool_size: default_pool_size(),
        }
    }
}

impl RedisConfig {
    pub fn url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}:{}/{}", self.server, self.port, self.database)
        } else {
            format!(
                "redis://:{}@{}:{}/{}",
                self.password, self.server, self.port, self.database
            )
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_max_retries() -> u32 {
    3
}

fn default_pool_size() -> u32 {
    16
}
