use ipnet::IpNet;
use std::net::IpAddr;
use std::str::FromStr;

const DEFAULT_V4_PREFIX: u8 = 24;
const DEFAULT_V6_PREFIX: u8 = 56;

/// A client-subnet address for EDNS Client Subnet injection, parsed from a
/// CIDR (`1.2.3.0/24`) or a plain address (which gets the conventional /24 or
/// /56 prefix).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcsAddress {
    pub ip: IpAddr,
    pub prefix: u8,
}

impl EcsAddress {
    /// EDNS option FAMILY field: 1 for IPv4, 2 for IPv6.
    pub fn family(&self) -> u16 {
        match self.ip {
            IpAddr::V4(_) => 1,
            IpAddr::V6(_) => 2,
        }
    }

    /// The CLIENT-SUBNET option payload: FAMILY, SOURCE PREFIX-LENGTH,
    /// SCOPE PREFIX-LENGTH (0), then the address truncated to the prefix.
    pub fn option_payload(&self) -> Vec<u8> {
        let net = IpNet::new(self.ip, self.prefix)
            .map(|n| n.trunc().addr())
            .unwrap_or(self.ip);
        let addr_bytes: Vec<u8> = match net {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        };
        let keep = (usize::from(self.prefix) + 7) / 8;

        let mut payload = Vec::with_capacity(4 + keep);
        payload.extend_from_slice(&self.family().to_be_bytes());
        payload.push(self.prefix);
        payload.push(0);
        payload.extend_from_slice(&addr_bytes[..keep]);
        payload
    }
}

impl FromStr for EcsAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(net) = s.parse::<IpNet>() {
            return Ok(EcsAddress {
                ip: net.addr(),
                prefix: net.prefix_len(),
            });
        }
        let ip = s
            .parse::<IpAddr>()
            .map_err(|_| format!("Invalid ECS address '{}'", s))?;
        let prefix = match ip {
            IpAddr::V4(_) => DEFAULT_V4_PREFIX,
            IpAddr::V6(_) => DEFAULT_V6_PREFIX,
        };
        Ok(EcsAddress { ip, prefix })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_v4_gets_default_prefix() {
        let ecs: EcsAddress = "1.2.3.4".parse().unwrap();
        assert_eq!(ecs.prefix, 24);
        assert_eq!(ecs.family(), 1);
    }

    #[test]
    fn plain_v6_gets_default_prefix() {
        let ecs: EcsAddress = "2001:db8::1".parse().unwrap();
        assert_eq!(ecs.prefix, 56);
        assert_eq!(ecs.family(), 2);
    }

    #[test]
    fn cidr_keeps_its_prefix() {
        let ecs: EcsAddress = "1.2.3.0/22".parse().unwrap();
        assert_eq!(ecs.prefix, 22);
    }

    #[test]
    fn payload_truncates_to_prefix() {
        let ecs: EcsAddress = "1.2.3.4/24".parse().unwrap();
        let payload = ecs.option_payload();
        // family=1, source=24, scope=0, then 3 network bytes
        assert_eq!(payload, vec![0, 1, 24, 0, 1, 2, 3]);
    }

    #[test]
    fn payload_masks_host_bits() {
        let ecs: EcsAddress = "1.2.3.255/20".parse().unwrap();
        let payload = ecs.option_payload();
        assert_eq!(&payload[..4], &[0, 1, 20, 0]);
        // /20 keeps 3 bytes, last one masked to its 4 leading bits
        assert_eq!(&payload[4..], &[1, 2, 0]);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!("not-an-ip".parse::<EcsAddress>().is_err());
    }
}
