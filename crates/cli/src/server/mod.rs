mod udp;

pub use udp::UdpServer;
