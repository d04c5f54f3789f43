use crate::dns::codec;
use crate::dns::transport::udp::UdpTransport;
use crate::dns::transport::DnsTransport;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use janus_dns_domain::{DnsError, Question, RecordType};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::debug;

/// Resolves hostnames that appear inside upstream nameserver endpoints,
/// before any query is routed. Plain UDP against the configured bootstrap
/// servers, raced, first address wins.
pub struct BootstrapResolver {
    nameservers: Vec<SocketAddr>,
    timeout: Duration,
}

impl BootstrapResolver {
    pub fn new(nameservers: &[String], timeout_secs: u64) -> Self {
        let nameservers = nameservers
            .iter()
            .filter_map(|raw| {
                if let Ok(addr) = raw.parse::<SocketAddr>() {
                    return Some(addr);
                }
                raw.parse::<IpAddr>().ok().map(|ip| SocketAddr::new(ip, 53))
            })
            .collect();
        Self {
            nameservers,
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nameservers.is_empty()
    }

    pub async fn resolve(&self, hostname: &str) -> Result<IpAddr, DnsError> {
        if self.nameservers.is_empty() {
            return Err(DnsError::Config(format!(
                "no bootstrap nameservers to resolve '{}'",
                hostname
            )));
        }

        let question = Question::new(hostname, RecordType::A);
        let query_bytes = codec::build_query(&question, None)?;

        let mut futs = FuturesUnordered::new();
        for server in &self.nameservers {
            let server = *server;
            let bytes = query_bytes.clone();
            let lookup_timeout = self.timeout;
            futs.push(tokio::spawn(async move {
                let transport = UdpTransport::new(server);
                let reply_bytes = transport.send(&bytes, lookup_timeout).await?;
                codec::parse_reply(&reply_bytes)
            }));
        }

        let mut last_error = String::from("no replies");
        while let Some(join_result) = futs.next().await {
            match join_result {
                Ok(Ok(reply)) => {
                    if let Some(ip) = reply.addresses().into_iter().next() {
                        debug!(hostname = %hostname, ip = %ip, "Bootstrap resolved");
                        return Ok(ip);
                    }
                    last_error = format!("empty answer ({})", reply.rcode);
                }
                Ok(Err(e)) => last_error = e.to_string(),
                Err(e) => last_error = e.to_string(),
            }
        }

        Err(DnsError::Transport {
            server: hostname.to_string(),
            reason: format!("bootstrap resolution failed: {}", last_error),
        })
    }
}
