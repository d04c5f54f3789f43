use super::DnsTransport;
use crate::dns::outbound::Outbound;
use async_trait::async_trait;
use janus_dns_domain::DnsError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

const MAX_TCP_MESSAGE_SIZE: usize = 65535;

/// Length-prefixed DNS over a stream connection obtained from the group's
/// outbound, so the same code serves direct and SOCKS5-proxied groups.
pub struct TcpTransport {
    server_addr: SocketAddr,
    outbound: Arc<dyn Outbound>,
}

impl TcpTransport {
    pub fn new(server_addr: SocketAddr, outbound: Arc<dyn Outbound>) -> Self {
        Self {
            server_addr,
            outbound,
        }
    }
}

#[async_trait]
impl DnsTransport for TcpTransport {
    async fn send(&self, message_bytes: &[u8], timeout: Duration) -> Result<Vec<u8>, DnsError> {
        let mut stream = tokio::time::timeout(
            timeout,
            self.outbound
                .connect(&self.server_addr.ip().to_string(), self.server_addr.port()),
        )
        .await
        .map_err(|_| DnsError::TransportTimeout {
            server: self.server_addr.to_string(),
        })??;

        tokio::time::timeout(timeout, send_with_length_prefix(&mut stream, message_bytes))
            .await
            .map_err(|_| DnsError::TransportTimeout {
                server: self.server_addr.to_string(),
            })??;

        debug!(
            server = %self.server_addr,
            outbound = self.outbound.tag(),
            message_len = message_bytes.len(),
            "TCP query sent"
        );

        let response_bytes = tokio::time::timeout(timeout, read_with_length_prefix(&mut stream))
            .await
            .map_err(|_| DnsError::TransportTimeout {
                server: self.server_addr.to_string(),
            })??;

        debug!(
            server = %self.server_addr,
            response_len = response_bytes.len(),
            "TCP response received"
        );

        Ok(response_bytes)
    }

    fn transport_name(&self) -> &'static str {
        "TCP"
    }
}

pub(crate) async fn send_with_length_prefix<S>(
    stream: &mut S,
    message_bytes: &[u8],
) -> Result<(), DnsError>
where
    S: AsyncWriteExt + Unpin,
{
    let length = message_bytes.len() as u16;

    stream
        .write_all(&length.to_be_bytes())
        .await
        .map_err(|e| DnsError::Io(format!("Failed to write length prefix: {}", e)))?;
    stream
        .write_all(message_bytes)
        .await
        .map_err(|e| DnsError::Io(format!("Failed to write DNS message: {}", e)))?;
    stream
        .flush()
        .await
        .map_err(|e| DnsError::Io(format!("Failed to flush stream: {}", e)))?;

    Ok(())
}

pub(crate) async fn read_with_length_prefix<S>(stream: &mut S) -> Result<Vec<u8>, DnsError>
where
    S: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| DnsError::Io(format!("Failed to read response length: {}", e)))?;

    let response_len = u16::from_be_bytes(len_buf) as usize;
    if response_len > MAX_TCP_MESSAGE_SIZE {
        return Err(DnsError::InvalidMessage(format!(
            "Response too large: {} bytes",
            response_len
        )));
    }

    let mut response = vec![0u8; response_len];
    stream
        .read_exact(&mut response)
        .await
        .map_err(|e| DnsError::Io(format!("Failed to read response body: {}", e)))?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    #[test]
    fn length_prefix_encoding() {
        let len: u16 = 300;
        let bytes = len.to_be_bytes();
        assert_eq!(bytes, [1, 44]);
        assert_eq!(u16::from_be_bytes(bytes), 300);
    }
}
