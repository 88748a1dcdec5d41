//! SoundTouch Core - discovery and synchronized control of Bose SoundTouch speakers.
//!
//! This crate finds SoundTouch speakers on the local network, keeps a registry
//! of initialized devices with an elected zone master, and sends commands to
//! the whole group in a fixed, sequential order.
//!
//! # Architecture
//!
//! - [`soundtouch`]: HTTP control API client, `/info` parsing, key and zone
//!   payloads, SSDP discovery
//! - [`device`]: A single initialized speaker
//! - [`services`]: Fade planning, the device registry and the zone coordinator
//! - [`state`]: Controller configuration
//! - [`error`]: Centralized error types and failure logging
//!
//! # Abstraction Traits
//!
//! Devices and the coordinator depend on traits rather than concrete clients:
//!
//! - [`SoundTouchClient`](soundtouch::SoundTouchClient): Control commands
//! - [`DeviceDiscovery`](soundtouch::DeviceDiscovery): SSDP search
//!
//! [`SoundTouchClientImpl`] and [`SsdpClient`] are the network-backed
//! implementations.

#![warn(clippy::all)]

pub mod device;
pub mod error;
pub mod protocol_constants;
pub mod services;
pub mod soundtouch;
pub mod state;
pub mod utils;

// Re-export commonly used types at the crate root
pub use device::{Device, DeviceError, DeviceResult};
pub use error::{ErrorCode, LogFailure, SoundTouchError, SoundTouchResult};
pub use state::{ControllerConfig, DiscoveryConfig, FadeConfig};
pub use utils::{control_uri, validate_device_address, AddressValidationError};

// Re-export SoundTouch types
pub use soundtouch::control::{ControlError, ControlResult};
pub use soundtouch::discovery::{DiscoveryError, DiscoveryResult, SsdpConfig, SsdpResponse};
pub use soundtouch::{
    DeviceDiscovery, DeviceInfo, Key, KeyState, NetworkInterface, SoundTouchClient,
    SoundTouchClientImpl, SsdpClient, UnknownKey, Zone,
};

// Re-export service types
pub use services::{
    DeviceRegistry, FadeOptions, FadePlan, Registration, SlaveFailure, ZoneCoordinator,
    ZoneReport,
};
