//! Datagram DNS transport (RFC 1035 §4.2.1). Messages are sent unframed;
//! replies larger than the buffer arrive truncated and the group retries
//! over TCP.

use super::DnsTransport;
use async_trait::async_trait;
use janus_dns_domain::DnsError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

const MAX_UDP_RESPONSE_SIZE: usize = 4096;

pub struct UdpTransport {
    server_addr: SocketAddr,
}

impl UdpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }
}

#[async_trait]
impl DnsTransport for UdpTransport {
    async fn send(&self, message_bytes: &[u8], timeout: Duration) -> Result<Vec<u8>, DnsError> {
        let bind_addr: SocketAddr = if self.server_addr.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| DnsError::Io(format!("Failed to bind UDP socket: {}", e)))?;

        tokio::time::timeout(timeout, socket.send_to(message_bytes, self.server_addr))
            .await
            .map_err(|_| DnsError::TransportTimeout {
                server: self.server_addr.to_string(),
            })?
            .map_err(|e| DnsError::Transport {
                server: self.server_addr.to_string(),
                reason: format!("send failed: {}", e),
            })?;

        let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        let (bytes_received, from_addr) =
            tokio::time::timeout(timeout, socket.recv_from(&mut recv_buf))
                .await
                .map_err(|_| DnsError::TransportTimeout {
                    server: self.server_addr.to_string(),
                })?
                .map_err(|e| DnsError::Transport {
                    server: self.server_addr.to_string(),
                    reason: format!("recv failed: {}", e),
                })?;

        if from_addr.ip() != self.server_addr.ip() {
            warn!(
                expected = %self.server_addr,
                received_from = %from_addr,
                "UDP response from unexpected source"
            );
        }

        recv_buf.truncate(bytes_received);

        debug!(
            server = %self.server_addr,
            response_len = bytes_received,
            "UDP response received"
        );

        Ok(recv_buf)
    }

    fn transport_name(&self) -> &'static str {
        "UDP"
    }
}
