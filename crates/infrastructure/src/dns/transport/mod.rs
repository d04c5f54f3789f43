pub mod https;
pub mod tcp;
pub mod tls;
pub mod udp;

#[cfg(feature = "dns-over-quic")]
pub mod quic;

use crate::dns::outbound::Outbound;
use async_trait::async_trait;
use janus_dns_domain::{DnsEndpoint, DnsError};
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait DnsTransport: Send + Sync {
    /// Exchange one packed DNS message, returning the raw reply bytes.
    async fn send(&self, message_bytes: &[u8], timeout: Duration) -> Result<Vec<u8>, DnsError>;

    fn transport_name(&self) -> &'static str;
}

pub enum Transport {
    Udp(udp::UdpTransport),
    Tcp(tcp::TcpTransport),
    Tls(tls::TlsTransport),
    Https(https::HttpsTransport),
    #[cfg(feature = "dns-over-quic")]
    Quic(quic::QuicTransport),
}

impl Transport {
    pub async fn send(&self, message_bytes: &[u8], timeout: Duration) -> Result<Vec<u8>, DnsError> {
        match self {
            Self::Udp(t) => DnsTransport::send(t, message_bytes, timeout).await,
            Self::Tcp(t) => DnsTransport::send(t, message_bytes, timeout).await,
            Self::Tls(t) => DnsTransport::send(t, message_bytes, timeout).await,
            Self::Https(t) => DnsTransport::send(t, message_bytes, timeout).await,
            #[cfg(feature = "dns-over-quic")]
            Self::Quic(t) => DnsTransport::send(t, message_bytes, timeout).await,
        }
    }

    pub fn transport_name(&self) -> &'static str {
        match self {
            Self::Udp(_) => "UDP",
            Self::Tcp(_) => "TCP",
            Self::Tls(_) => "TLS",
            Self::Https(_) => "HTTPS",
            #[cfg(feature = "dns-over-quic")]
            Self::Quic(_) => "QUIC",
        }
    }
}

/// Instantiate the transport an endpoint's scheme dictates. TCP and HTTPS
/// dial through the group's outbound; the datagram transports require a
/// direct outbound, which the config validator guarantees.
pub fn create_transport(
    endpoint: &DnsEndpoint,
    outbound: Arc<dyn Outbound>,
    http_client: reqwest::Client,
) -> Result<Transport, DnsError> {
    let resolved = |ep: &DnsEndpoint| {
        ep.socket_addr().ok_or_else(|| DnsError::Transport {
            server: ep.to_string(),
            reason: "hostname was never resolved".to_string(),
        })
    };

    match endpoint {
        DnsEndpoint::Udp { .. } => Ok(Transport::Udp(udp::UdpTransport::new(resolved(endpoint)?))),
        DnsEndpoint::Tcp { .. } => Ok(Transport::Tcp(tcp::TcpTransport::new(
            resolved(endpoint)?,
            outbound,
        ))),
        DnsEndpoint::Tls { hostname, .. } => Ok(Transport::Tls(tls::TlsTransport::new(
            resolved(endpoint)?,
            hostname.to_string(),
        ))),
        DnsEndpoint::Https { url, .. } => Ok(Transport::Https(https::HttpsTransport::new(
            url.to_string(),
            http_client,
        ))),
        #[cfg(feature = "dns-over-quic")]
        DnsEndpoint::Quic { hostname, .. } => Ok(Transport::Quic(quic::QuicTransport::new(
            resolved(endpoint)?,
            hostname.clone(),
        ))),
        #[cfg(not(feature = "dns-over-quic"))]
        DnsEndpoint::Quic { .. } => Err(DnsError::Transport {
            server: endpoint.to_string(),
            reason: "QUIC support not compiled in (enable 'dns-over-quic')".to_string(),
        }),
    }
}
