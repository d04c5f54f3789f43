use super::{BoxedStream, Outbound};
use async_trait::async_trait;
use janus_dns_domain::DnsError;
use tokio::net::TcpStream;

/// Plain TCP dialer.
pub struct DirectOutbound;

#[async_trait]
impl Outbound for DirectOutbound {
    async fn connect(&self, host: &str, port: u16) -> Result<BoxedStream, DnsError> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| DnsError::Transport {
                server: format!("{}:{}", host, port),
                reason: e.to_string(),
            })?;
        Ok(Box::new(stream))
    }

    fn tag(&self) -> &str {
        "direct"
    }

    fn is_direct(&self) -> bool {
        true
    }
}
