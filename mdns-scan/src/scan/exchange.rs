use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6};
use std::time::Duration;
use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, warn};
use shared::protocol::{MDNS_GROUP_V4, MDNS_GROUP_V6, MDNS_PORT};
use shared::types::Registry;
use crate::dns::{decode_message, encode_query, Header};
use crate::interface::LocalInterface;
use crate::interpret::apply;
use super::Prober;

/// Largest datagram an mDNS responder may send
const MAX_DATAGRAM: usize = 9000;

/// Multicast membership held by a [`GroupSocket`]
enum Membership {
    V4 { interface: Ipv4Addr },
    V6 { index: u32 },
}

/// Ephemeral UDP endpoint that leaves its multicast group when dropped,
/// including when the owning exchange is cancelled mid-flight.
struct GroupSocket {
    socket: UdpSocket,
    membership: Option<Membership>,
}

impl GroupSocket {
    fn open_v4(interface: Ipv4Addr) -> io::Result<Self> {
        let raw = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        raw.set_reuse_address(true)?;
        raw.set_nonblocking(true)?;
        raw.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)).into())?;
        let socket = UdpSocket::from_std(raw.into())?;

        let membership = match socket.join_multicast_v4(MDNS_GROUP_V4, interface) {
            Ok(()) => Some(Membership::V4 { interface }),
            Err(e) => {
                debug!("Failed to join {} on {}: {}", MDNS_GROUP_V4, interface, e);
                None
            }
        };
        Ok(Self { socket, membership })
    }

    fn open_v6(index: u32) -> io::Result<Self> {
        let raw = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
        raw.set_only_v6(true)?;
        raw.set_reuse_address(true)?;
        raw.set_nonblocking(true)?;
        raw.bind(&SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)).into())?;
        let socket = UdpSocket::from_std(raw.into())?;

        let membership = match socket.join_multicast_v6(&MDNS_GROUP_V6, index) {
            Ok(()) => Some(Membership::V6 { index }),
            Err(e) => {
                debug!("Failed to join {} on interface {}: {}", MDNS_GROUP_V6, index, e);
                None
            }
        };
        Ok(Self { socket, membership })
    }
}

impl Drop for GroupSocket {
    fn drop(&mut self) {
        let result = match self.membership.take() {
            Some(Membership::V4 { interface }) => {
                self.socket.leave_multicast_v4(MDNS_GROUP_V4, interface)
            }
            Some(Membership::V6 { index }) => self.socket.leave_multicast_v6(&MDNS_GROUP_V6, index),
            None => Ok(()),
        };
        if let Err(e) = result {
            debug!("Failed to leave multicast group: {}", e);
        }
    }
}

/// Real exchange engine: one query datagram per target, then collect replies
/// on both address families until an absolute deadline.
#[derive(Debug, Clone)]
pub struct MulticastProber {
    port: u16,
}

impl Default for MulticastProber {
    fn default() -> Self {
        Self::new(MDNS_PORT)
    }
}

impl MulticastProber {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    fn destination(&self, interface: &LocalInterface, target: IpAddr) -> SocketAddr {
        match target {
            IpAddr::V4(ip) => SocketAddr::from((ip, self.port)),
            IpAddr::V6(ip) => {
                let scope = if is_link_local(&ip) { interface.index } else { 0 };
                SocketAddr::V6(SocketAddrV6::new(ip, self.port, 0, scope))
            }
        }
    }
}

fn is_link_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xffc0 == 0xfe80
}

fn open_or_log<F>(family: &str, open: F) -> Option<GroupSocket>
where
    F: FnOnce() -> io::Result<GroupSocket>,
{
    match open() {
        Ok(socket) => Some(socket),
        Err(e) => {
            warn!("Failed to open {} socket: {}", family, e);
            None
        }
    }
}

async fn recv_on(
    socket: Option<&GroupSocket>,
    buf: &mut [u8],
) -> io::Result<(usize, SocketAddr)> {
    match socket {
        Some(s) => s.socket.recv_from(buf).await,
        None => std::future::pending().await,
    }
}

/// Record the sender and fold every decodable record of the datagram into it
fn fold_datagram(devices: &mut Registry, from: SocketAddr, datagram: &[u8]) {
    if let Ok(header) = Header::parse(datagram) {
        if !header.is_response() {
            debug!("Ignoring query from {}", from);
            return;
        }
    }
    let device = devices.entry(from.ip()).or_default();
    match decode_message(datagram) {
        Ok(records) => {
            let mut added = 0;
            for record in &records {
                if apply(device, record) {
                    added += 1;
                }
            }
            debug!(
                "{} records from {}, {} new",
                records.len(),
                from.ip(),
                added
            );
        }
        Err(e) => debug!("Undecodable datagram from {}: {}", from, e),
    }
}

enum Received {
    V4(io::Result<(usize, SocketAddr)>),
    V6(io::Result<(usize, SocketAddr)>),
}

async fn collect(
    mut v4: Option<GroupSocket>,
    mut v6: Option<GroupSocket>,
    deadline: Instant,
    devices: &mut Registry,
) {
    let mut buf4 = vec![0u8; MAX_DATAGRAM];
    let mut buf6 = vec![0u8; MAX_DATAGRAM];

    while v4.is_some() || v6.is_some() {
        let received = tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            r = recv_on(v4.as_ref(), &mut buf4) => Received::V4(r),
            r = recv_on(v6.as_ref(), &mut buf6) => Received::V6(r),
        };

        match received {
            Received::V4(Ok((len, from))) => fold_datagram(devices, from, &buf4[..len]),
            Received::V6(Ok((len, from))) => fold_datagram(devices, from, &buf6[..len]),
            Received::V4(Err(e)) => {
                warn!("IPv4 receive failed: {}", e);
                v4 = None;
            }
            Received::V6(Err(e)) => {
                warn!("IPv6 receive failed: {}", e);
                v6 = None;
            }
        }
    }
}

#[async_trait]
impl Prober for MulticastProber {
    async fn query(
        &self,
        interface: &LocalInterface,
        service_names: &[String],
        target: IpAddr,
        timeout: Duration,
    ) -> Registry {
        let mut devices = Registry::new();
        let deadline = Instant::now() + timeout;

        let packet = match encode_query(service_names) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Cannot encode query for {}: {}", target, e);
                return devices;
            }
        };

        let v4_interface = match interface.ip {
            IpAddr::V4(ip) => ip,
            IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
        };
        let v4 = open_or_log("IPv4", || GroupSocket::open_v4(v4_interface));
        let v6 = if target.is_ipv6() {
            open_or_log("IPv6", || GroupSocket::open_v6(interface.index))
        } else {
            None
        };

        let sender = if target.is_ipv4() { v4.as_ref() } else { v6.as_ref() };
        match sender {
            Some(socket) => {
                let destination = self.destination(interface, target);
                if let Err(e) = socket.socket.send_to(&packet, destination).await {
                    warn!("Failed to send query to {}: {}", destination, e);
                }
            }
            None => debug!("No socket available to reach {}", target),
        }

        collect(v4, v6, deadline, &mut devices).await;
        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interface() -> LocalInterface {
        LocalInterface {
            name: "eth0".to_string(),
            ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)),
            index: 3,
        }
    }

    #[test]
    fn test_destination_v4() {
        let prober = MulticastProber::default();
        let dest = prober.destination(&interface(), "192.168.1.5".parse().unwrap());
        assert_eq!(dest, "192.168.1.5:5353".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_destination_link_local_v6_is_scoped() {
        let prober = MulticastProber::default();
        match prober.destination(&interface(), "fe80::1".parse().unwrap()) {
            SocketAddr::V6(v6) => assert_eq!(v6.scope_id(), 3),
            other => panic!("unexpected destination {}", other),
        }
        match prober.destination(&interface(), "fd00::1".parse().unwrap()) {
            SocketAddr::V6(v6) => assert_eq!(v6.scope_id(), 0),
            other => panic!("unexpected destination {}", other),
        }
    }

    #[test]
    fn test_fold_creates_device_even_for_garbage() {
        let mut devices = Registry::new();
        let from: SocketAddr = "192.168.1.5:5353".parse().unwrap();
        fold_datagram(&mut devices, from, &[1, 2, 3]);
        assert!(devices[&from.ip()].is_empty());
    }

    #[test]
    fn test_fold_ignores_queries() {
        let mut devices = Registry::new();
        let from: SocketAddr = "192.168.1.7:5353".parse().unwrap();
        let query = encode_query(&["_http._tcp.local"]).unwrap();
        fold_datagram(&mut devices, from, &query);
        assert!(devices.is_empty());
    }
}
