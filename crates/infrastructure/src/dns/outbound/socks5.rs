use super::{BoxedStream, Outbound};
use async_trait::async_trait;
use janus_dns_domain::DnsError;
use tokio_socks::tcp::Socks5Stream;
use tracing::debug;

/// SOCKS5 CONNECT dialer with optional username/password auth.
pub struct Socks5Outbound {
    tag: String,
    proxy_addr: String,
    username: String,
    password: String,
}

impl Socks5Outbound {
    pub fn new(tag: String, server: &str, port: u16, username: String, password: String) -> Self {
        Self {
            tag,
            proxy_addr: format!("{}:{}", server, port),
            username,
            password,
        }
    }
}

#[async_trait]
impl Outbound for Socks5Outbound {
    async fn connect(&self, host: &str, port: u16) -> Result<BoxedStream, DnsError> {
        debug!(proxy = %self.proxy_addr, target = %host, port, "Dialing through SOCKS5");

        let stream = if self.username.is_empty() {
            Socks5Stream::connect(self.proxy_addr.as_str(), (host, port)).await
        } else {
            Socks5Stream::connect_with_password(
                self.proxy_addr.as_str(),
                (host, port),
                &self.username,
                &self.password,
            )
            .await
        }
        .map_err(|e| DnsError::Transport {
            server: format!("{}:{}", host, port),
            reason: format!("SOCKS5 via {}: {}", self.proxy_addr, e),
        })?;

        Ok(Box::new(stream))
    }

    fn tag(&self) -> &str {
        &self.tag
    }
}
