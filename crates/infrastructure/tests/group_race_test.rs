use hickory_proto::op::{Message, MessageType, OpCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{RData, Record};
use janus_dns_infrastructure::dns::outbound::DirectOutbound;
use janus_dns_infrastructure::dns::transport::https::direct_client;
use janus_dns_infrastructure::dns::upstream::UpstreamGroup;
use janus_dns_domain::{DnsEndpoint, EndpointAddr, Question, Rcode, RecordType};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;

/// A minimal nameserver answering every A question with a fixed address.
async fn spawn_mock_server(answer: Ipv4Addr, delay_ms: u64) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            let Ok((n, from)) = socket.recv_from(&mut buf).await else {
                break;
            };
            let Ok(request) = Message::from_vec(&buf[..n]) else {
                continue;
            };

            if delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            }

            let mut response = Message::new();
            response.set_id(request.id());
            response.set_message_type(MessageType::Response);
            response.set_op_code(OpCode::Query);
            response.set_recursion_desired(request.recursion_desired());
            response.set_recursion_available(true);
            if let Some(query) = request.queries().first() {
                response.add_query(query.clone());
                response.add_answer(Record::from_rdata(
                    query.name().clone(),
                    300,
                    RData::A(A(answer)),
                ));
            }
            if let Ok(bytes) = response.to_vec() {
                let _ = socket.send_to(&bytes, from).await;
            }
        }
    });

    addr
}

fn udp_endpoint(addr: SocketAddr) -> DnsEndpoint {
    DnsEndpoint::Udp {
        addr: EndpointAddr::Resolved(addr),
    }
}

fn group(name: &str, endpoints: Vec<DnsEndpoint>) -> UpstreamGroup {
    UpstreamGroup::new(name, endpoints, Arc::new(DirectOutbound), direct_client(), None)
}

#[tokio::test]
async fn race_returns_the_fastest_reply() {
    let fast = spawn_mock_server(Ipv4Addr::new(1, 1, 1, 1), 0).await;
    let slow = spawn_mock_server(Ipv4Addr::new(2, 2, 2, 2), 300).await;

    let group = group("test", vec![udp_endpoint(slow), udp_endpoint(fast)]);
    let reply = group
        .query(&Question::new("example.com.", RecordType::A), None)
        .await
        .unwrap();

    assert_eq!(reply.rcode, Rcode::NoError);
    assert_eq!(reply.addresses()[0].to_string(), "1.1.1.1");
}

#[tokio::test]
async fn race_survives_a_dead_nameserver() {
    let live = spawn_mock_server(Ipv4Addr::new(3, 3, 3, 3), 0).await;
    // Bind-and-drop so the port is free of listeners.
    let dead = {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.local_addr().unwrap()
    };

    let group = group("test", vec![udp_endpoint(dead), udp_endpoint(live)]);
    let reply = group
        .query(&Question::new("example.com.", RecordType::A), None)
        .await
        .unwrap();

    assert_eq!(reply.addresses()[0].to_string(), "3.3.3.3");
}

#[tokio::test]
async fn identical_answers_are_scheduling_independent() {
    let a = spawn_mock_server(Ipv4Addr::new(9, 9, 9, 9), 0).await;
    let b = spawn_mock_server(Ipv4Addr::new(9, 9, 9, 9), 5).await;

    let group = group("test", vec![udp_endpoint(a), udp_endpoint(b)]);
    for _ in 0..5 {
        let reply = group
            .query(&Question::new("example.com.", RecordType::A), None)
            .await
            .unwrap();
        assert_eq!(reply.addresses()[0].to_string(), "9.9.9.9");
        assert_eq!(reply.answers.len(), 1);
    }
}

#[tokio::test]
async fn empty_group_fails() {
    let group = group("empty", vec![]);
    let result = group
        .query(&Question::new("example.com.", RecordType::A), None)
        .await;
    assert!(result.is_err());
}
