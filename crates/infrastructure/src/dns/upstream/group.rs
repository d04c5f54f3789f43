use crate::dns::codec;
use crate::dns::outbound::{DirectOutbound, Outbound};
use crate::dns::transport::create_transport;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use janus_dns_domain::{DnsEndpoint, DnsError, DnsReply, EcsAddress, Question};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Bound on one group query when the caller's deadline is larger.
pub const GROUP_TIMEOUT: Duration = Duration::from_secs(5);

/// A named bag of nameserver endpoints sharing one outbound and one ECS
/// policy. A query races every endpoint and surfaces exactly one reply.
pub struct UpstreamGroup {
    name: Arc<str>,
    endpoints: Vec<DnsEndpoint>,
    outbound: Arc<dyn Outbound>,
    http_client: reqwest::Client,
    ecs: Option<EcsAddress>,
    timeout: Duration,
}

impl UpstreamGroup {
    pub fn new(
        name: &str,
        endpoints: Vec<DnsEndpoint>,
        outbound: Arc<dyn Outbound>,
        http_client: reqwest::Client,
        ecs: Option<EcsAddress>,
    ) -> Self {
        Self {
            name: Arc::from(name),
            endpoints,
            outbound,
            http_client,
            ecs,
            timeout: GROUP_TIMEOUT,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ecs(&self) -> Option<&EcsAddress> {
        self.ecs.as_ref()
    }

    /// Resolve the question by racing all endpoints. The first non-error
    /// reply wins; the rest are aborted without further side effects. When
    /// every endpoint fails, the last observed cause is surfaced.
    pub async fn query(
        &self,
        question: &Question,
        ecs_override: Option<&str>,
    ) -> Result<DnsReply, DnsError> {
        if self.endpoints.is_empty() {
            return Err(DnsError::UpstreamAllFailed {
                group: self.name.to_string(),
                last_error: "no nameservers configured".to_string(),
            });
        }

        // A malformed per-policy override never fails the query.
        let ecs = match ecs_override {
            Some(raw) => match raw.parse::<EcsAddress>() {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    debug!(group = %self.name, error = %e, "Skipping unparseable ECS override");
                    self.ecs
                }
            },
            None => self.ecs,
        };

        let query_bytes = codec::build_query(question, ecs.as_ref())?;
        let start = Instant::now();

        debug!(
            group = %self.name,
            endpoints = self.endpoints.len(),
            question = %question,
            ecs = ecs.is_some(),
            "Racing group nameservers"
        );

        let mut abort_handles = Vec::with_capacity(self.endpoints.len());
        let mut futs = FuturesUnordered::new();

        for endpoint in &self.endpoints {
            let endpoint = endpoint.clone();
            let outbound = self.outbound.clone();
            let http_client = self.http_client.clone();
            let bytes = query_bytes.clone();
            let per_query_timeout = self.timeout;

            let handle = tokio::spawn(async move {
                query_endpoint(&endpoint, outbound, http_client, &bytes, per_query_timeout).await
            });
            abort_handles.push(handle.abort_handle());
            futs.push(handle);
        }

        let result = timeout(self.timeout, async {
            let mut last_error = DnsError::QueryTimeout;
            while let Some(join_result) = futs.next().await {
                match join_result {
                    Ok(Ok((endpoint, reply))) => {
                        debug!(
                            group = %self.name,
                            nameserver = %endpoint,
                            rcode = %reply.rcode,
                            answers = reply.answers.len(),
                            latency_ms = start.elapsed().as_millis() as u64,
                            "Fastest usable reply"
                        );
                        return Ok(reply);
                    }
                    Ok(Err(e)) => {
                        debug!(group = %self.name, error = %e, "Nameserver failed");
                        last_error = e;
                    }
                    Err(e) => {
                        warn!(group = %self.name, error = %e, "Race task panicked");
                    }
                }
            }
            Err(DnsError::UpstreamAllFailed {
                group: self.name.to_string(),
                last_error: last_error.to_string(),
            })
        })
        .await;

        // Losers are cancelled before they can log or touch anything.
        for handle in &abort_handles {
            handle.abort();
        }

        match result {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(group = %self.name, timeout = ?self.timeout, "Group query timed out");
                Err(DnsError::UpstreamAllFailed {
                    group: self.name.to_string(),
                    last_error: DnsError::QueryTimeout.to_string(),
                })
            }
        }
    }
}

async fn query_endpoint(
    endpoint: &DnsEndpoint,
    outbound: Arc<dyn Outbound>,
    http_client: reqwest::Client,
    query_bytes: &[u8],
    per_query_timeout: Duration,
) -> Result<(DnsEndpoint, DnsReply), DnsError> {
    let dns_transport = create_transport(endpoint, outbound, http_client.clone())?;
    let response_bytes = dns_transport.send(query_bytes, per_query_timeout).await?;
    let mut reply = codec::parse_reply(&response_bytes)?;

    // Truncated datagram replies retry over TCP, per transport convention.
    if reply.truncated {
        if let DnsEndpoint::Udp { addr } = endpoint {
            debug!(nameserver = %endpoint, "Reply truncated, retrying via TCP");
            let tcp_endpoint = DnsEndpoint::Tcp { addr: addr.clone() };
            let tcp = create_transport(&tcp_endpoint, Arc::new(DirectOutbound), http_client)?;
            let tcp_bytes = tcp.send(query_bytes, per_query_timeout).await?;
            reply = codec::parse_reply(&tcp_bytes)?;
        }
    }

    Ok((endpoint.clone(), reply))
}
