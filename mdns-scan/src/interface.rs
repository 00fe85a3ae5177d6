use std::net::IpAddr;
use anyhow::{Context, Result};
use serde::Deserialize;
use crate::scan::Cidr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    #[default]
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    pub fn matches(&self, ip: &IpAddr) -> bool {
        matches!(
            (self, ip),
            (AddressFamily::Ipv4, IpAddr::V4(_)) | (AddressFamily::Ipv6, IpAddr::V6(_))
        )
    }
}

/// The local address the scan runs from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInterface {
    pub name: String,
    pub ip: IpAddr,
    /// OS interface index, used to scope IPv6 multicast
    pub index: u32,
}

impl LocalInterface {
    /// Find the first address of `family` on the interface called `name`
    pub fn resolve(name: &str, family: AddressFamily) -> Result<Self> {
        let interfaces =
            if_addrs::get_if_addrs().context("Failed to enumerate network interfaces")?;

        interfaces
            .into_iter()
            .find(|iface| iface.name == name && family.matches(&iface.ip()))
            .map(|iface| Self {
                ip: iface.ip(),
                index: iface.index.unwrap_or(0),
                name: iface.name,
            })
            .with_context(|| format!("Interface '{}' has no {:?} address", name, family))
    }

    /// All usable interfaces, loopback excluded
    pub fn list() -> Result<Vec<Self>> {
        let interfaces =
            if_addrs::get_if_addrs().context("Failed to enumerate network interfaces")?;
        Ok(interfaces
            .into_iter()
            .filter(|iface| !iface.is_loopback())
            .map(|iface| Self {
                ip: iface.ip(),
                index: iface.index.unwrap_or(0),
                name: iface.name,
            })
            .collect())
    }

    /// The /24 around an IPv4 interface address; IPv6 needs an explicit range
    pub fn default_cidr(&self) -> Option<Cidr> {
        match self.ip {
            IpAddr::V4(ip) => Some(Cidr::around_v4(ip)),
            IpAddr::V6(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_matches() {
        let v4: IpAddr = "10.0.0.1".parse().unwrap();
        let v6: IpAddr = "fe80::1".parse().unwrap();
        assert!(AddressFamily::Ipv4.matches(&v4));
        assert!(!AddressFamily::Ipv4.matches(&v6));
        assert!(AddressFamily::Ipv6.matches(&v6));
    }

    #[test]
    fn test_default_cidr() {
        let iface = LocalInterface {
            name: "eth0".to_string(),
            ip: "192.168.7.42".parse().unwrap(),
            index: 2,
        };
        assert_eq!(iface.default_cidr().unwrap().to_string(), "192.168.7.0/24");

        let iface = LocalInterface {
            ip: "fe80::1".parse().unwrap(),
            ..iface
        };
        assert!(iface.default_cidr().is_none());
    }
}
