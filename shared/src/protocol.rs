use std::net::{Ipv4Addr, Ipv6Addr};

/// UDP port mDNS responders listen on
pub const MDNS_PORT: u16 = 5353;

/// IPv4 link-local multicast group for mDNS
pub const MDNS_GROUP_V4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// IPv6 link-local multicast group for mDNS (ff02::fb)
pub const MDNS_GROUP_V6: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

/// Service types queried when the configuration does not name any
pub const DEFAULT_SERVICE_TYPES: &[&str] = &[
    "_services._dns-sd._udp.local",
    "_http._tcp.local",
    "_https._tcp.local",
    "_workstation._tcp.local",
    "_ssh._tcp.local",
    "_smb._tcp.local",
    "_afpovertcp._tcp.local",
    "_device-info._tcp.local",
    "_ipp._tcp.local",
    "_ipps._tcp.local",
    "_printer._tcp.local",
    "_pdl-datastream._tcp.local",
    "_airplay._tcp.local",
    "_raop._tcp.local",
    "_googlecast._tcp.local",
    "_spotify-connect._tcp.local",
    "_homekit._tcp.local",
    "_hap._tcp.local",
    "_companion-link._tcp.local",
    "_sleep-proxy._udp.local",
];
