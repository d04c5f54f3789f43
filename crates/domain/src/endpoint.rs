use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

const DNS_PORT: u16 = 53;
const DOT_PORT: u16 = 853;
const DOQ_PORT: u16 = 853;

/// An upstream nameserver address that may still need bootstrap resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EndpointAddr {
    Resolved(SocketAddr),
    Unresolved { hostname: Arc<str>, port: u16 },
}

impl EndpointAddr {
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match self {
            EndpointAddr::Resolved(addr) => Some(*addr),
            EndpointAddr::Unresolved { .. } => None,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            EndpointAddr::Resolved(addr) => addr.port(),
            EndpointAddr::Unresolved { port, .. } => *port,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, EndpointAddr::Unresolved { .. })
    }

    pub fn unresolved_parts(&self) -> Option<(&str, u16)> {
        match self {
            EndpointAddr::Unresolved { hostname, port } => Some((hostname, *port)),
            EndpointAddr::Resolved(_) => None,
        }
    }
}

impl fmt::Display for EndpointAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointAddr::Resolved(addr) => write!(f, "{}", addr),
            EndpointAddr::Unresolved { hostname, port } => write!(f, "{}:{}", hostname, port),
        }
    }
}

/// A nameserver endpoint. The scheme of the configuration string selects the
/// transport: bare address or `udp://` is datagram DNS, `tcp://` is framed
/// TCP, `tls://` is DoT, `https://` is DoH, `quic://` is DoQ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DnsEndpoint {
    Udp { addr: EndpointAddr },
    Tcp { addr: EndpointAddr },
    Tls { addr: EndpointAddr, hostname: Arc<str> },
    Https { url: Arc<str>, hostname: Arc<str> },
    Quic { addr: EndpointAddr, hostname: Arc<str> },
}

impl DnsEndpoint {
    pub fn addr(&self) -> Option<&EndpointAddr> {
        match self {
            DnsEndpoint::Udp { addr }
            | DnsEndpoint::Tcp { addr }
            | DnsEndpoint::Tls { addr, .. }
            | DnsEndpoint::Quic { addr, .. } => Some(addr),
            DnsEndpoint::Https { .. } => None,
        }
    }

    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.addr().and_then(EndpointAddr::socket_addr)
    }

    pub fn transport_name(&self) -> &'static str {
        match self {
            DnsEndpoint::Udp { .. } => "UDP",
            DnsEndpoint::Tcp { .. } => "TCP",
            DnsEndpoint::Tls { .. } => "TLS",
            DnsEndpoint::Https { .. } => "HTTPS",
            DnsEndpoint::Quic { .. } => "QUIC",
        }
    }

    /// True if the endpoint needs a bootstrap lookup before it can be dialed.
    pub fn needs_resolution(&self) -> bool {
        self.addr().map(EndpointAddr::is_unresolved).unwrap_or(false)
    }

    /// Same endpoint with its hostname replaced by a resolved socket address.
    pub fn with_resolved_addr(&self, resolved: SocketAddr) -> Self {
        match self {
            DnsEndpoint::Udp { .. } => DnsEndpoint::Udp {
                addr: EndpointAddr::Resolved(resolved),
            },
            DnsEndpoint::Tcp { .. } => DnsEndpoint::Tcp {
                addr: EndpointAddr::Resolved(resolved),
            },
            DnsEndpoint::Tls { hostname, .. } => DnsEndpoint::Tls {
                addr: EndpointAddr::Resolved(resolved),
                hostname: hostname.clone(),
            },
            DnsEndpoint::Quic { hostname, .. } => DnsEndpoint::Quic {
                addr: EndpointAddr::Resolved(resolved),
                hostname: hostname.clone(),
            },
            DnsEndpoint::Https { .. } => self.clone(),
        }
    }

    /// Whether this transport may be used behind a non-direct outbound.
    /// Only stream transports the outbound can carry qualify.
    pub fn proxyable(&self) -> bool {
        matches!(self, DnsEndpoint::Tcp { .. } | DnsEndpoint::Https { .. })
    }
}

fn parse_host_port(s: &str, default_port: u16) -> Option<(&str, u16)> {
    if let Some(rest) = s.strip_prefix('[') {
        let end = rest.find(']')?;
        let host = &rest[..end];
        match rest[end + 1..].strip_prefix(':') {
            Some(port_str) => Some((host, port_str.parse().ok()?)),
            None if rest[end + 1..].is_empty() => Some((host, default_port)),
            None => None,
        }
    } else if let Some((host, port_str)) = s.rsplit_once(':') {
        // A second colon means a bare IPv6 address without a port.
        if host.contains(':') {
            Some((s, default_port))
        } else {
            Some((host, port_str.parse().ok()?))
        }
    } else {
        Some((s, default_port))
    }
}

fn parse_endpoint_addr(s: &str, default_port: u16) -> Result<EndpointAddr, String> {
    let (host, port) = parse_host_port(s, default_port)
        .ok_or_else(|| format!("Invalid address '{}'", s))?;
    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        return Ok(EndpointAddr::Resolved(SocketAddr::new(ip, port)));
    }
    Ok(EndpointAddr::Unresolved {
        hostname: host.into(),
        port,
    })
}

fn parse_tls_like(rest: &str, default_port: u16) -> Result<(EndpointAddr, Arc<str>), String> {
    let addr = parse_endpoint_addr(rest, default_port)?;
    let hostname: Arc<str> = match &addr {
        EndpointAddr::Resolved(sa) => sa.ip().to_string().into(),
        EndpointAddr::Unresolved { hostname, .. } => hostname.clone(),
    };
    Ok((addr, hostname))
}

impl FromStr for DnsEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("udp://") {
            let addr = parse_endpoint_addr(rest, DNS_PORT)?;
            return Ok(DnsEndpoint::Udp { addr });
        }
        if let Some(rest) = s.strip_prefix("tcp://") {
            let addr = parse_endpoint_addr(rest, DNS_PORT)?;
            return Ok(DnsEndpoint::Tcp { addr });
        }
        if let Some(rest) = s.strip_prefix("tls://") {
            let (addr, hostname) = parse_tls_like(rest, DOT_PORT)?;
            return Ok(DnsEndpoint::Tls { addr, hostname });
        }
        if let Some(rest) = s.strip_prefix("quic://") {
            let (addr, hostname) = parse_tls_like(rest, DOQ_PORT)?;
            return Ok(DnsEndpoint::Quic { addr, hostname });
        }
        if s.starts_with("https://") {
            let hostname: Arc<str> = s
                .strip_prefix("https://")
                .and_then(|rest| rest.split('/').next())
                .filter(|h| !h.is_empty())
                .map(|h| h.split(':').next().unwrap_or(h))
                .ok_or_else(|| format!("Invalid HTTPS URL: {}", s))?
                .into();
            return Ok(DnsEndpoint::Https {
                url: s.into(),
                hostname,
            });
        }
        // No scheme: plain UDP nameserver, port 53 unless given.
        let addr = parse_endpoint_addr(s, DNS_PORT).map_err(|_| {
            format!(
                "Invalid nameserver '{}'. Expected udp://, tcp://, tls://, https://, quic://, or a plain address",
                s
            )
        })?;
        Ok(DnsEndpoint::Udp { addr })
    }
}

impl fmt::Display for DnsEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsEndpoint::Udp { addr } => write!(f, "udp://{}", addr),
            DnsEndpoint::Tcp { addr } => write!(f, "tcp://{}", addr),
            DnsEndpoint::Tls { addr, hostname } => write!(f, "tls://{}:{}", hostname, addr.port()),
            DnsEndpoint::Https { url, .. } => write!(f, "{}", url),
            DnsEndpoint::Quic { addr, hostname } => {
                write!(f, "quic://{}:{}", hostname, addr.port())
            }
        }
    }
}
