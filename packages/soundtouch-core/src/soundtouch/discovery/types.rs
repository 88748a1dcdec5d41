//! Shared types for SSDP device discovery.

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

/// How M-SEARCH requests are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryMethod {
    /// SSDP multicast to 239.255.255.250:1900
    SsdpMulticast,
    /// SSDP broadcast (directed per-interface + limited 255.255.255.255)
    SsdpBroadcast,
}

impl std::fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SsdpMulticast => write!(f, "SSDP multicast"),
            Self::SsdpBroadcast => write!(f, "SSDP broadcast"),
        }
    }
}

/// Errors that can occur while setting up discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Failed to bind UDP socket for discovery.
    #[error("failed to bind UDP socket: {0}")]
    SocketBind(#[source] std::io::Error),

    /// No usable network interfaces found.
    #[error("no usable network interfaces found")]
    NoInterfaces,

    /// Every search request failed to send.
    #[error("failed to send any SSDP search on {0}")]
    SendFailed(DiscoveryMethod),
}

/// Convenient Result alias for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// One response to an M-SEARCH request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsdpResponse {
    /// HTTP status code from the response line.
    pub status: u16,
    /// Header name/value pairs in the order received.
    pub headers: Vec<(String, String)>,
    /// Socket address the response came from.
    pub remote: SocketAddr,
}

impl SsdpResponse {
    /// Returns the first header with the given name (ASCII case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Address of the responding device.
    pub fn address(&self) -> IpAddr {
        self.remote.ip()
    }

    /// Returns true for a `200 OK` reply.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Virtual interface prefixes to filter out during discovery.
pub const VIRTUAL_INTERFACE_PREFIXES: &[&str] = &[
    "lo", "docker", "veth", "br-", "virbr", "vmnet", "vbox", "tun", "tap",
];

/// Checks if an interface name belongs to a virtual/container interface.
pub fn is_virtual_interface(name: &str) -> bool {
    let name_lower = name.to_lowercase();
    VIRTUAL_INTERFACE_PREFIXES
        .iter()
        .any(|prefix| name_lower.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_virtual_interface() {
        assert!(is_virtual_interface("lo"));
        assert!(is_virtual_interface("docker0"));
        assert!(is_virtual_interface("veth1234"));
        assert!(is_virtual_interface("br-abc"));
        assert!(!is_virtual_interface("eth0"));
        assert!(!is_virtual_interface("en0"));
        assert!(!is_virtual_interface("wlan0"));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let response = SsdpResponse {
            status: 200,
            headers: vec![("LOCATION".into(), "http://10.0.0.4:8091/XD/BO5EBO5E-F00D-F00D-FEED-A0F6FD1E2A3B.xml".into())],
            remote: "10.0.0.4:1900".parse().expect("valid addr"),
        };
        assert!(response.header("location").is_some());
        assert!(response.header("usn").is_none());
        assert_eq!(response.address().to_string(), "10.0.0.4");
    }
}
