//! Controller configuration.

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{KEY_HOLD_MS, MEDIA_RENDERER_SEARCH_TARGET};
use crate::services::volume_fade::FadeOptions;
use crate::soundtouch::discovery::SsdpConfig;
use crate::utils::validate_device_address;

/// SSDP search settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// `ST` header of each M-SEARCH.
    pub search_target: String,

    /// Number of M-SEARCH rounds.
    pub rounds: u32,

    /// Wait after each round (milliseconds).
    pub round_window_ms: u64,

    /// MX value (seconds).
    pub mx: u64,

    /// Send searches to broadcast addresses instead of the multicast group.
    pub broadcast: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_target: MEDIA_RENDERER_SEARCH_TARGET.to_string(),
            rounds: 3,
            round_window_ms: 2000,
            mx: 1,
            broadcast: true,
        }
    }
}

impl DiscoveryConfig {
    pub fn to_ssdp_config(&self) -> SsdpConfig {
        SsdpConfig {
            search_target: self.search_target.clone(),
            rounds: self.rounds,
            round_window: Duration::from_millis(self.round_window_ms),
            mx_value: self.mx,
            broadcast: self.broadcast,
        }
    }
}

/// Default fade parameters for group and device fades.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FadeConfig {
    pub start: u8,
    pub duration_ms: u64,
    pub step: u8,
}

impl Default for FadeConfig {
    fn default() -> Self {
        let options = FadeOptions::default();
        Self {
            start: options.start,
            duration_ms: options.duration.as_millis() as u64,
            step: options.step,
        }
    }
}

impl FadeConfig {
    pub fn to_options(&self) -> FadeOptions {
        FadeOptions {
            start: self.start,
            duration: Duration::from_millis(self.duration_ms),
            step: self.step,
        }
    }
}

/// Configuration for the zone controller.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ControllerConfig {
    /// Device name preferred as zone master. Empty means "first found".
    pub master_name: String,

    /// Addresses probed directly alongside SSDP discovery.
    ///
    /// Must be IPv4 literals: SSDP responders are registered under their IP,
    /// so a hostname would register the same speaker a second time.
    pub fallback_addresses: Vec<String>,

    pub discovery: DiscoveryConfig,

    /// Pause after each key press and release (milliseconds).
    pub key_hold_ms: u64,

    pub fade: FadeConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            master_name: String::new(),
            fallback_addresses: Vec::new(),
            discovery: DiscoveryConfig::default(),
            key_hold_ms: KEY_HOLD_MS,
            fade: FadeConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn key_hold(&self) -> Duration {
        Duration::from_millis(self.key_hold_ms)
    }

    /// Validates configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.discovery.rounds == 0 {
            return Err("discovery.rounds must be >= 1".to_string());
        }
        if self.discovery.search_target.trim().is_empty() {
            return Err("discovery.search_target must not be empty".to_string());
        }
        if self.fade.step == 0 {
            return Err("fade.step must be >= 1".to_string());
        }
        for address in &self.fallback_addresses {
            validate_device_address(address)
                .map_err(|e| format!("fallback_addresses: {}", e))?;
            if address.trim().parse::<Ipv4Addr>().is_err() {
                return Err(format!(
                    "fallback_addresses: {} must be an IPv4 address, SSDP responders are keyed by IP",
                    address.trim()
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = ControllerConfig::default();
        assert_eq!(config.key_hold(), Duration::from_millis(200));
        assert_eq!(config.discovery.rounds, 3);
        assert_eq!(config.fade.to_options(), FadeOptions::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config: ControllerConfig = serde_json::from_str(
            r#"{"master_name":"Working","discovery":{"rounds":1},"fade":{"step":5}}"#,
        )
        .expect("valid config");

        assert_eq!(config.master_name, "Working");
        assert_eq!(config.discovery.rounds, 1);
        assert_eq!(config.discovery.round_window_ms, 2000);
        assert_eq!(config.fade.step, 5);
        assert_eq!(config.fade.duration_ms, 20_000);
        assert_eq!(config.key_hold_ms, 200);
    }

    #[test]
    fn ssdp_window_is_rounds_times_round_window() {
        let discovery = DiscoveryConfig {
            rounds: 2,
            round_window_ms: 1500,
            ..DiscoveryConfig::default()
        };
        assert_eq!(
            discovery.to_ssdp_config().collection_window(),
            Duration::from_millis(3000)
        );
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = ControllerConfig::default();
        config.discovery.rounds = 0;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.fade.step = 0;
        assert!(config.validate().is_err());

        let config = ControllerConfig {
            fallback_addresses: vec!["192.168.1.20".into(), "127.0.0.1".into()],
            ..ControllerConfig::default()
        };
        let err = config.validate().expect_err("loopback fallback");
        assert!(err.contains("127.0.0.1"));
    }

    #[test]
    fn validate_rejects_hostname_fallback() {
        let config = ControllerConfig {
            fallback_addresses: vec!["kitchen.local".into()],
            ..ControllerConfig::default()
        };
        let err = config.validate().expect_err("hostname fallback");
        assert!(err.contains("kitchen.local"));
        assert!(err.contains("IPv4"));

        let config = ControllerConfig {
            fallback_addresses: vec![" 192.168.1.20 ".into()],
            ..ControllerConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
