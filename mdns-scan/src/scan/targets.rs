use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use super::ScanError;

/// An IPv4 or IPv6 network in CIDR notation, host bits cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    network: IpAddr,
    prefix: u8,
}

fn width(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn to_bits(addr: &IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u128::from(u32::from(*v4)),
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

impl Cidr {
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self, ScanError> {
        if prefix > width(&addr) {
            return Err(ScanError::InvalidCidr(
                format!("{}/{}", addr, prefix),
                format!("prefix length must be <= {}", width(&addr)),
            ));
        }
        let network = Self::from_bits(&addr, to_bits(&addr) & Self::mask(width(&addr), prefix));
        Ok(Self { network, prefix })
    }

    /// The /24 containing `ip`
    pub fn around_v4(ip: Ipv4Addr) -> Self {
        let octets = ip.octets();
        Self {
            network: IpAddr::V4(Ipv4Addr::new(octets[0], octets[1], octets[2], 0)),
            prefix: 24,
        }
    }

    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn mask(width: u8, prefix: u8) -> u128 {
        let host_bits = u32::from(width - prefix);
        let all = if width == 128 { u128::MAX } else { (1u128 << width) - 1 };
        all & !Self::host_mask(host_bits)
    }

    fn host_mask(host_bits: u32) -> u128 {
        if host_bits >= 128 {
            u128::MAX
        } else {
            (1u128 << host_bits) - 1
        }
    }

    fn from_bits(like: &IpAddr, bits: u128) -> IpAddr {
        match like {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::from(bits as u32)),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::from(bits)),
        }
    }

    /// First and last usable host, as integers.
    ///
    /// IPv4 skips the network and broadcast addresses, IPv6 skips the
    /// subnet-router anycast address; point-to-point and single-host prefixes
    /// keep every address.
    fn host_range(&self) -> (u128, u128) {
        let width = width(&self.network);
        let first = to_bits(&self.network);
        let last = first | Self::host_mask(u32::from(width - self.prefix));
        match self.network {
            IpAddr::V4(_) if self.prefix < 31 => (first + 1, last - 1),
            IpAddr::V6(_) if self.prefix < 127 => (first + 1, last),
            _ => (first, last),
        }
    }

    pub fn host_count(&self) -> u128 {
        let (first, last) = self.host_range();
        (last - first).saturating_add(1)
    }

    /// Every host address in the network, in ascending order
    pub fn hosts(&self) -> impl Iterator<Item = IpAddr> {
        let (first, last) = self.host_range();
        let network = self.network;
        (first..=last).map(move |bits| Self::from_bits(&network, bits))
    }
}

impl FromStr for Cidr {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ScanError::InvalidCidr(s.to_string(), reason);

        let (addr, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid("expected <address>/<prefix>".to_string()))?;
        let addr = IpAddr::from_str(addr).map_err(|e| invalid(format!("bad address: {}", e)))?;
        let prefix = prefix
            .parse::<u8>()
            .map_err(|e| invalid(format!("bad prefix length: {}", e)))?;

        Self::new(addr, prefix)
            .map_err(|_| invalid(format!("prefix length must be <= {}", width(&addr))))
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(cidr: &str) -> Vec<String> {
        cidr.parse::<Cidr>()
            .unwrap()
            .hosts()
            .map(|ip| ip.to_string())
            .collect()
    }

    #[test]
    fn test_slash_24() {
        let cidr: Cidr = "192.168.1.0/24".parse().unwrap();
        assert_eq!(cidr.host_count(), 254);
        let all = hosts("192.168.1.0/24");
        assert_eq!(all.first().unwrap(), "192.168.1.1");
        assert_eq!(all.last().unwrap(), "192.168.1.254");
        assert_eq!(all.len(), 254);
    }

    #[test]
    fn test_host_bits_are_masked() {
        let cidr: Cidr = "192.168.1.77/24".parse().unwrap();
        assert_eq!(cidr.to_string(), "192.168.1.0/24");
    }

    #[test]
    fn test_small_prefixes() {
        assert_eq!(hosts("10.0.0.0/30"), vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(hosts("10.0.0.0/31"), vec!["10.0.0.0", "10.0.0.1"]);
        assert_eq!(hosts("10.0.0.9/32"), vec!["10.0.0.9"]);
    }

    #[test]
    fn test_ipv6() {
        let cidr: Cidr = "fd00::/120".parse().unwrap();
        assert_eq!(cidr.host_count(), 255);
        assert_eq!(hosts("fd00::/127"), vec!["fd00::", "fd00::1"]);
        assert_eq!(hosts("fd00::/126"), vec!["fd00::1", "fd00::2", "fd00::3"]);
    }

    #[test]
    fn test_huge_ranges_count_without_overflow() {
        let cidr: Cidr = "::/0".parse().unwrap();
        assert_eq!(cidr.host_count(), u128::MAX);
        let cidr: Cidr = "0.0.0.0/0".parse().unwrap();
        assert_eq!(cidr.host_count(), (1u128 << 32) - 2);
    }

    #[test]
    fn test_invalid() {
        for text in [
            "bogus",
            "192.168.1.0",
            "192.168.1.0/33",
            "fd00::/129",
            "300.1.1.1/24",
            "10.0.0.0/x",
        ] {
            assert!(
                matches!(text.parse::<Cidr>(), Err(ScanError::InvalidCidr(_, _))),
                "{} should be rejected",
                text
            );
        }
    }

    #[test]
    fn test_around_v4() {
        let cidr = Cidr::around_v4(Ipv4Addr::new(10, 1, 2, 3));
        assert_eq!(cidr.to_string(), "10.1.2.0/24");
    }
}
