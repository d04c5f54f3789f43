use super::DnsTransport;
use async_trait::async_trait;
use janus_dns_domain::DnsError;
use std::time::Duration;
use tracing::debug;

/// Expected media type for DNS-over-HTTPS exchanges (RFC 8484 §4.2.1).
const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

/// DNS over HTTPS (RFC 8484). The client is built per outbound by the
/// upstream manager — a proxied group gets a client whose dials go through
/// its SOCKS5 outbound — and reuses connections across queries.
pub struct HttpsTransport {
    url: String,
    client: reqwest::Client,
}

impl HttpsTransport {
    pub fn new(url: String, client: reqwest::Client) -> Self {
        Self { url, client }
    }
}

#[async_trait]
impl DnsTransport for HttpsTransport {
    async fn send(&self, message_bytes: &[u8], timeout: Duration) -> Result<Vec<u8>, DnsError> {
        debug!(
            url = %self.url,
            message_len = message_bytes.len(),
            "Sending DoH query"
        );

        let response = tokio::time::timeout(
            timeout,
            self.client
                .post(&self.url)
                .header("Content-Type", DNS_MESSAGE_CONTENT_TYPE)
                .header("Accept", DNS_MESSAGE_CONTENT_TYPE)
                .body(message_bytes.to_vec())
                .send(),
        )
        .await
        .map_err(|_| DnsError::TransportTimeout {
            server: self.url.clone(),
        })?
        .map_err(|e| DnsError::Transport {
            server: self.url.clone(),
            reason: format!("request failed: {}", e),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DnsError::Transport {
                server: self.url.clone(),
                reason: format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            });
        }

        let response_bytes = tokio::time::timeout(timeout, response.bytes())
            .await
            .map_err(|_| DnsError::TransportTimeout {
                server: self.url.clone(),
            })?
            .map_err(|e| DnsError::Transport {
                server: self.url.clone(),
                reason: format!("failed to read body: {}", e),
            })?;

        debug!(
            url = %self.url,
            response_len = response_bytes.len(),
            "DoH response received"
        );

        Ok(response_bytes.to_vec())
    }

    fn transport_name(&self) -> &'static str {
        "HTTPS"
    }
}

/// Shared client for direct (non-proxied) DoH groups: rustls, HTTP/2
/// keep-alive, a small idle pool per host.
pub fn direct_client() -> reqwest::Client {
    reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(4)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Client for a SOCKS5-proxied group; `socks5h` so DoH hostnames resolve at
/// the proxy rather than locally.
pub fn proxied_client(
    server: &str,
    port: u16,
    username: &str,
    password: &str,
) -> Result<reqwest::Client, DnsError> {
    let proxy_url = if username.is_empty() {
        format!("socks5h://{}:{}", server, port)
    } else {
        format!("socks5h://{}:{}@{}:{}", username, password, server, port)
    };

    let proxy = reqwest::Proxy::all(&proxy_url).map_err(|e| {
        DnsError::Config(format!("invalid SOCKS5 proxy {}:{}: {}", server, port, e))
    })?;

    reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(4)
        .proxy(proxy)
        .build()
        .map_err(|e| DnsError::Config(format!("failed to build DoH client: {}", e)))
}
