mod direct;
mod socks5;

pub use direct::DirectOutbound;
pub use socks5::Socks5Outbound;

use async_trait::async_trait;
use janus_dns_domain::DnsError;
use tokio::io::{AsyncRead, AsyncWrite};

/// A stream connection produced by an outbound, ready for framed DNS.
pub trait OutboundStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> OutboundStream for T {}

pub type BoxedStream = Box<dyn OutboundStream>;

/// An abstract dialer producing a stream connection to `(host, port)`.
/// Implementations are safe for concurrent use.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn connect(&self, host: &str, port: u16) -> Result<BoxedStream, DnsError>;

    fn tag(&self) -> &str;

    fn is_direct(&self) -> bool {
        false
    }
}
