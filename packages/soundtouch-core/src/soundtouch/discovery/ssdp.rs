//! SSDP search client.
//!
//! Supports both multicast (239.255.255.250) and broadcast addressing for
//! networks with different multicast configurations.
//!
//! Each search round sends one M-SEARCH per interface and target, then waits
//! one round window. Responses are forwarded to the caller as they arrive,
//! for the whole collection window (`rounds × round_window`).
//!
//! The same socket is used for send AND receive since devices reply unicast
//! back to the sending socket/port.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use local_ip_address::list_afinet_netifas;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{timeout, Instant};

use super::types::{
    is_virtual_interface, DiscoveryError, DiscoveryMethod, DiscoveryResult, SsdpResponse,
};
use crate::protocol_constants::{
    MEDIA_RENDERER_SEARCH_TARGET, SSDP_LIMITED_BROADCAST_ADDR, SSDP_MULTICAST_ADDR, SSDP_PORT,
};
use crate::soundtouch::traits::DeviceDiscovery;

/// Checks if `s` starts with `prefix` (ASCII case-insensitive, no allocation).
#[inline]
fn starts_with_ignore_ascii_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Build the M-SEARCH message.
///
/// Note: HOST header always uses the multicast address (UPnP Device Architecture),
/// even when sending via broadcast.
fn build_msearch_message(search_target: &str, mx: u64) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: 239.255.255.250:1900\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\r\n",
        mx, search_target
    )
}

/// Configuration for one SSDP collection window.
#[derive(Debug, Clone)]
pub struct SsdpConfig {
    /// Search target (`ST` header).
    pub search_target: String,
    /// Number of search rounds.
    pub rounds: u32,
    /// Wait after each round; the collection window is `rounds × round_window`.
    pub round_window: Duration,
    /// MX value (max response delay in seconds).
    pub mx_value: u64,
    /// Address searches via broadcast instead of multicast.
    pub broadcast: bool,
}

impl SsdpConfig {
    /// Total time responses are collected for.
    pub fn collection_window(&self) -> Duration {
        self.round_window * self.rounds
    }

    fn method(&self) -> DiscoveryMethod {
        if self.broadcast {
            DiscoveryMethod::SsdpBroadcast
        } else {
            DiscoveryMethod::SsdpMulticast
        }
    }
}

impl Default for SsdpConfig {
    fn default() -> Self {
        Self {
            search_target: MEDIA_RENDERER_SEARCH_TARGET.to_string(),
            rounds: 3,
            round_window: Duration::from_millis(2000),
            mx_value: 1,
            broadcast: true,
        }
    }
}

/// Network interface information for discovery.
#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    /// Interface name (e.g., "en0", "eth0").
    pub name: String,
    /// IPv4 address bound to this interface.
    pub ip: Ipv4Addr,
    /// Broadcast address for this interface (if available).
    pub broadcast: Option<Ipv4Addr>,
}

/// Gets all usable network interfaces for discovery.
///
/// Filters out virtual/container interfaces and loopback.
pub fn get_interfaces() -> Vec<InterfaceInfo> {
    list_afinet_netifas()
        .unwrap_or_else(|e| {
            log::warn!("[Discovery] Failed to list network interfaces: {}", e);
            Vec::new()
        })
        .into_iter()
        .filter_map(|(name, addr)| {
            if is_virtual_interface(&name) {
                log::debug!("[Discovery] Skipping virtual interface: {}", name);
                return None;
            }
            match addr {
                IpAddr::V4(ipv4) if !ipv4.is_loopback() => {
                    // Netmask is not reported; assume /24
                    let octets = ipv4.octets();
                    let broadcast = Ipv4Addr::new(octets[0], octets[1], octets[2], 255);
                    Some(InterfaceInfo {
                        name,
                        ip: ipv4,
                        broadcast: Some(broadcast),
                    })
                }
                _ => None,
            }
        })
        .collect()
}

/// Creates a UDP socket bound to a specific interface.
fn create_socket(iface_ip: Ipv4Addr, enable_broadcast: bool) -> Result<UdpSocket, DiscoveryError> {
    let bind_addr = SocketAddr::new(IpAddr::V4(iface_ip), 0);

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(DiscoveryError::SocketBind)?;

    if let Err(e) = socket.set_reuse_address(true) {
        log::warn!("[Discovery] Failed to set SO_REUSEADDR on {}: {}", iface_ip, e);
    }

    // UPnP 1.0 recommends TTL of 4 for SSDP multicast
    if let Err(e) = socket.set_multicast_ttl_v4(4) {
        log::warn!("[Discovery] Failed to set multicast TTL on {}: {}", iface_ip, e);
    }

    if enable_broadcast {
        if let Err(e) = socket.set_broadcast(true) {
            log::warn!("[Discovery] Failed to set SO_BROADCAST on {}: {}", iface_ip, e);
        }
    }

    socket
        .set_nonblocking(true)
        .map_err(DiscoveryError::SocketBind)?;
    socket
        .bind(&bind_addr.into())
        .map_err(DiscoveryError::SocketBind)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(DiscoveryError::SocketBind)
}

/// Parses an SSDP datagram into status, headers and sender.
///
/// Returns None for anything that is not an HTTP response (e.g. NOTIFY or
/// M-SEARCH traffic from other control points).
pub fn parse_ssdp_response(datagram: &str, remote: SocketAddr) -> Option<SsdpResponse> {
    let mut lines = datagram.lines();
    let status_line = lines.next()?;
    if !starts_with_ignore_ascii_case(status_line, "HTTP/") {
        return None;
    }
    let status = status_line.split_whitespace().nth(1)?.parse().ok()?;

    let headers = lines
        .take_while(|l| !l.trim().is_empty())
        .filter_map(|l| {
            // Split at the first colon so URL values keep theirs
            let idx = l.find(':')?;
            Some((l[..idx].trim().to_string(), l[idx + 1..].trim().to_string()))
        })
        .collect();

    Some(SsdpResponse {
        status,
        headers,
        remote,
    })
}

/// Target addresses for one interface.
fn target_addrs(iface: &InterfaceInfo, use_broadcast: bool) -> Vec<String> {
    if use_broadcast {
        let mut addrs = Vec::new();
        if let Some(broadcast) = iface.broadcast {
            addrs.push(format!("{}:{}", broadcast, SSDP_PORT));
        }
        addrs.push(SSDP_LIMITED_BROADCAST_ADDR.to_string());
        addrs
    } else {
        vec![SSDP_MULTICAST_ADDR.to_string()]
    }
}

/// SSDP client that searches on every usable interface.
#[derive(Debug, Clone, Default)]
pub struct SsdpClient;

impl SsdpClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeviceDiscovery for SsdpClient {
    async fn search(
        &self,
        config: &SsdpConfig,
        responses: UnboundedSender<SsdpResponse>,
    ) -> DiscoveryResult<()> {
        let method = config.method();
        let interfaces = get_interfaces();
        if interfaces.is_empty() {
            return Err(DiscoveryError::NoInterfaces);
        }

        let mut sockets: Vec<(InterfaceInfo, Arc<UdpSocket>)> = Vec::new();
        for iface in interfaces {
            match create_socket(iface.ip, config.broadcast) {
                Ok(socket) => sockets.push((iface, Arc::new(socket))),
                Err(e) => {
                    log::warn!(
                        "[Discovery] Failed to create socket for {} ({}): {}",
                        iface.name,
                        iface.ip,
                        e
                    );
                }
            }
        }
        if sockets.is_empty() {
            return Err(DiscoveryError::NoInterfaces);
        }

        log::debug!(
            "[Discovery] {} search for {} on {} interface(s): {} round(s) of {}ms",
            method,
            config.search_target,
            sockets.len(),
            config.rounds,
            config.round_window.as_millis()
        );

        let msg = build_msearch_message(&config.search_target, config.mx_value);
        let sent = AtomicUsize::new(0);
        let window = config.collection_window();

        let send_futures = sockets.iter().map(|(iface, socket)| {
            let targets = target_addrs(iface, config.broadcast);
            let msg = msg.as_bytes();
            let sent = &sent;
            async move {
                for round in 0..config.rounds {
                    if round > 0 {
                        tokio::time::sleep(config.round_window).await;
                    }
                    for target in &targets {
                        match socket.send_to(msg, target).await {
                            Ok(_) => {
                                sent.fetch_add(1, Ordering::Relaxed);
                                log::trace!(
                                    "[Discovery] Sent M-SEARCH from {} to {} (round {})",
                                    iface.ip,
                                    target,
                                    round + 1
                                );
                            }
                            Err(e) => log::warn!(
                                "[Discovery] Failed to send M-SEARCH on {} to {} (round {}): {}",
                                iface.name,
                                target,
                                round + 1,
                                e
                            ),
                        }
                    }
                }
            }
        });

        let recv_futures = sockets.iter().map(|(iface, socket)| {
            let responses = responses.clone();
            async move {
                let mut buf = [0u8; 2048];
                let deadline = Instant::now() + window;
                loop {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    match timeout(remaining, socket.recv_from(&mut buf)).await {
                        Ok(Ok((amt, src))) => {
                            let datagram = String::from_utf8_lossy(&buf[..amt]);
                            if let Some(response) = parse_ssdp_response(&datagram, src) {
                                log::debug!(
                                    "[Discovery] Response {} from {} via {}",
                                    response.status,
                                    src,
                                    iface.name
                                );
                                // Receiver gone means the caller stopped listening
                                if responses.send(response).is_err() {
                                    break;
                                }
                            }
                        }
                        Ok(Err(e)) => {
                            log::warn!(
                                "[Discovery] Socket recv error on {} ({}): {}",
                                iface.name,
                                iface.ip,
                                e
                            );
                        }
                        Err(_) => break,
                    }
                }
            }
        });

        tokio::join!(
            futures::future::join_all(send_futures),
            futures::future::join_all(recv_futures)
        );

        if sent.load(Ordering::Relaxed) == 0 {
            return Err(DiscoveryError::SendFailed(method));
        }

        log::debug!("[Discovery] {} collection window closed", method);
        Ok(())
    }
}
