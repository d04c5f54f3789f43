use hickory_proto::op::Message;
use janus_dns_application::QueryRouter;
use janus_dns_infrastructure::dns::codec;
use janus_dns_domain::{DnsReply, Question, Rcode, RecordType};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Datagrams above this are fragmented on common paths; clients advertising
/// more via EDNS are capped here.
const MAX_UDP_REPLY: usize = 1232;
const MIN_UDP_REPLY: usize = 512;

pub struct UdpServer {
    bind_addr: SocketAddr,
    router: Arc<QueryRouter>,
    shutdown: CancellationToken,
}

impl UdpServer {
    pub fn new(bind_addr: SocketAddr, router: Arc<QueryRouter>, shutdown: CancellationToken) -> Self {
        Self {
            bind_addr,
            router,
            shutdown,
        }
    }

    /// Run one worker socket per core (SO_REUSEPORT) until shutdown.
    pub async fn run(&self) -> anyhow::Result<()> {
        let num_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        info!(bind_address = %self.bind_addr, num_workers, "Starting UDP DNS server");

        let mut join_set: JoinSet<()> = JoinSet::new();
        for worker_id in 0..num_workers {
            let socket = Arc::new(create_udp_socket(self.bind_addr)?);
            let router = self.router.clone();
            let shutdown = self.shutdown.clone();
            join_set.spawn(async move {
                run_worker(socket, router, shutdown, worker_id).await;
            });
        }

        info!("DNS server ready on {}", self.bind_addr);
        while join_set.join_next().await.is_some() {}
        Ok(())
    }
}

async fn run_worker(
    socket: Arc<UdpSocket>,
    router: Arc<QueryRouter>,
    shutdown: CancellationToken,
    worker_id: usize,
) {
    let mut recv_buf = [0u8; 4096];

    loop {
        let (n, from) = tokio::select! {
            result = socket.recv_from(&mut recv_buf) => match result {
                Ok(received) => received,
                Err(e) => {
                    error!(worker = worker_id, error = %e, "UDP recv error");
                    continue;
                }
            },
            _ = shutdown.cancelled() => {
                debug!(worker = worker_id, "UDP worker stopping");
                return;
            }
        };

        let datagram = recv_buf[..n].to_vec();
        let router = router.clone();
        let socket = socket.clone();
        tokio::spawn(async move {
            if let Some(response) = handle_datagram(&router, &datagram, from).await {
                let _ = socket.send_to(&response, from).await;
            }
        });
    }
}

/// Parse, route, and serialize one query; `None` drops the datagram.
async fn handle_datagram(
    router: &QueryRouter,
    datagram: &[u8],
    from: SocketAddr,
) -> Option<Vec<u8>> {
    let request = match Message::from_vec(datagram) {
        Ok(message) => message,
        Err(e) => {
            debug!(client = %from, error = %e, "Undecodable datagram");
            return None;
        }
    };
    let query = request.queries().first()?.clone();

    let question = Question::new(
        &query.name().to_utf8(),
        RecordType::from_u16(u16::from(query.query_type())),
    );
    debug!(client = %from, question = %question, "Query received");

    let max_reply = request
        .extensions()
        .as_ref()
        .map(|edns| (edns.max_payload() as usize).clamp(MIN_UDP_REPLY, MAX_UDP_REPLY))
        .unwrap_or(MIN_UDP_REPLY);

    let reply = match router.route(&question).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(client = %from, question = %question, error = %e, "Query failed");
            DnsReply::empty(Rcode::ServFail)
        }
    };

    match encode_bounded(request.id(), &question, request.recursion_desired(), &reply, max_reply) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            error!(client = %from, error = %e, "Failed to serialize reply");
            None
        }
    }
}

/// Serialize a reply under the client's size limit. Oversized replies are
/// marked TC and trimmed: additional first, then authority, then answers
/// down to the last one.
fn encode_bounded(
    id: u16,
    question: &Question,
    recursion_desired: bool,
    reply: &DnsReply,
    max_size: usize,
) -> Result<Vec<u8>, janus_dns_domain::DnsError> {
    let message = codec::reply_message(id, question, recursion_desired, reply)?;
    let bytes = codec::serialize(&message)?;
    if bytes.len() <= max_size {
        return Ok(bytes);
    }

    let mut trimmed = reply.clone();
    trimmed.truncated = true;
    loop {
        let message = codec::reply_message(id, question, recursion_desired, &trimmed)?;
        let bytes = codec::serialize(&message)?;
        if bytes.len() <= max_size {
            return Ok(bytes);
        }
        if trimmed.additional.pop().is_some() {
            continue;
        }
        if trimmed.authority.pop().is_some() {
            continue;
        }
        if trimmed.answers.len() > 1 {
            trimmed.answers.pop();
            continue;
        }
        // Nothing left to shed; let the client retry over TCP.
        return Ok(bytes);
    }
}

fn create_udp_socket(bind_addr: SocketAddr) -> anyhow::Result<UdpSocket> {
    let domain = if bind_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if bind_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_recv_buffer_size(8 * 1024 * 1024)?;
    socket.set_send_buffer_size(4 * 1024 * 1024)?;
    socket.bind(&bind_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use janus_dns_domain::{RecordData, ResourceRecord};
    use std::net::Ipv4Addr;

    fn big_reply(answers: usize) -> DnsReply {
        let mut reply = DnsReply::empty(Rcode::NoError);
        for i in 0..answers {
            reply.answers.push(ResourceRecord {
                name: Arc::from(format!("host-{:03}.very-long-label.example.com.", i)),
                rtype: RecordType::A,
                class: 1,
                ttl: 300,
                data: RecordData::A(Ipv4Addr::new(10, 0, (i / 256) as u8, (i % 256) as u8)),
            });
        }
        reply
    }

    #[test]
    fn small_replies_are_untouched() {
        let question = Question::new("example.com.", RecordType::A);
        let reply = big_reply(1);
        let bytes = encode_bounded(1, &question, true, &reply, MAX_UDP_REPLY).unwrap();
        let parsed = Message::from_vec(&bytes).unwrap();
        assert!(!parsed.truncated());
        assert_eq!(parsed.answers().len(), 1);
    }

    #[test]
    fn oversized_replies_are_truncated_with_tc() {
        let question = Question::new("example.com.", RecordType::A);
        let reply = big_reply(100);
        let bytes = encode_bounded(1, &question, true, &reply, MIN_UDP_REPLY).unwrap();
        assert!(bytes.len() <= MIN_UDP_REPLY);
        let parsed = Message::from_vec(&bytes).unwrap();
        assert!(parsed.truncated());
        assert!(!parsed.answers().is_empty(), "at least one answer survives");
    }
}
