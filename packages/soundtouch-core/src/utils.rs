//! General utilities shared across the library.

use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;

use crate::protocol_constants::CONTROL_PORT;

// ─────────────────────────────────────────────────────────────────────────────
// Timing
// ─────────────────────────────────────────────────────────────────────────────

/// Suspends the current task for `duration`.
///
/// Zero durations return without yielding to the timer.
pub async fn delay(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Addressing
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the control endpoint for a device address: `http://{address}:8090`.
#[must_use]
pub fn control_uri(address: &str) -> String {
    format!("http://{}:{}", address, CONTROL_PORT)
}

/// Errors returned by [`validate_device_address`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressValidationError {
    #[error("address is empty")]
    Empty,

    #[error("{0} is not a routable IPv4 address")]
    NotRoutable(String),

    #[error("IPv6 address {0} is not supported")]
    Ipv6(String),

    #[error("{0} is neither an IPv4 address nor a hostname")]
    Malformed(String),
}

/// Validates a configured device address (IPv4 literal or hostname).
///
/// Rejects loopback, unspecified, multicast and broadcast IPv4 addresses.
/// Anything that parses as an IP is judged as an IP; everything else must
/// look like a DNS hostname.
pub fn validate_device_address(address: &str) -> Result<(), AddressValidationError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(AddressValidationError::Empty);
    }

    match address.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            if ip.is_loopback() || ip.is_unspecified() || ip.is_multicast() || ip.is_broadcast() {
                Err(AddressValidationError::NotRoutable(address.to_string()))
            } else {
                Ok(())
            }
        }
        Ok(IpAddr::V6(_)) => Err(AddressValidationError::Ipv6(address.to_string())),
        Err(_) if is_hostname(address) => Ok(()),
        Err(_) => Err(AddressValidationError::Malformed(address.to_string())),
    }
}

fn is_hostname(value: &str) -> bool {
    value.len() <= 253
        && value.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
