//! SoundTouch speaker control and discovery.
//!
//! This module talks to Bose SoundTouch speakers over their local HTTP
//! control API (port 8090) and finds them with SSDP.
//!
//! # Module Structure
//!
//! - `traits` - Trait abstractions for testability
//! - `client` - `SoundTouchClientImpl` concrete trait implementation
//! - `control` - Low-level HTTP transport and error-document detection
//! - `info` - `/info` document parsing and validation
//! - `keys` - Remote-control key names and `/key` payloads
//! - `zone` - `/setZone` and `/addZoneSlave` payloads
//! - `discovery` - SSDP M-SEARCH client (multicast or broadcast)

pub mod client;
pub mod control;
pub mod discovery;
pub mod info;
pub mod keys;
pub(crate) mod retry;
pub mod traits;
pub mod zone;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export domain types
pub use info::{DeviceInfo, InfoDocument, NetworkInterface};
pub use keys::{Key, KeyState, UnknownKey};
pub use zone::Zone;

// Re-export trait abstractions
pub use traits::{
    DeviceDiscovery, DeviceInfoSource, KeyControl, SoundTouchClient, VolumeControl, ZoneControl,
};

// Re-export concrete implementations
pub use client::SoundTouchClientImpl;
pub use discovery::SsdpClient;
