//! Trait abstractions for SoundTouch operations.
//!
//! These traits enable dependency injection for testability and modularity.
//! Devices and the zone coordinator depend on traits rather than on the
//! concrete HTTP and SSDP clients.
//!
//! Every control method takes the device's control endpoint
//! (`http://{address}:8090`) rather than a bare address.

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::soundtouch::control::ControlResult;
use crate::soundtouch::discovery::{DiscoveryResult, SsdpConfig, SsdpResponse};
use crate::soundtouch::info::InfoDocument;
use crate::soundtouch::keys::{Key, KeyState};
use crate::soundtouch::zone::Zone;

/// Device identity queries.
#[async_trait]
pub trait DeviceInfoSource: Send + Sync {
    /// Fetches and parses `GET {endpoint}/info`.
    async fn get_info(&self, endpoint: &str) -> ControlResult<InfoDocument>;
}

/// Volume control.
#[async_trait]
pub trait VolumeControl: Send + Sync {
    /// Sets the device volume (`POST {endpoint}/volume`).
    ///
    /// The valid range is enforced by the device, not here.
    async fn set_volume(&self, endpoint: &str, level: u8) -> ControlResult<()>;
}

/// Remote-control key presses.
#[async_trait]
pub trait KeyControl: Send + Sync {
    /// Sends one phase of a key command (`POST {endpoint}/key`).
    async fn send_key(&self, endpoint: &str, key: Key, state: KeyState) -> ControlResult<()>;
}

/// Zone topology commands.
#[async_trait]
pub trait ZoneControl: Send + Sync {
    /// Creates the zone on its master (`POST {endpoint}/setZone`).
    async fn set_zone(&self, endpoint: &str, zone: &Zone) -> ControlResult<()>;

    /// Joins a member to the zone (`POST {endpoint}/addZoneSlave`).
    async fn add_zone_slave(&self, endpoint: &str, zone: &Zone) -> ControlResult<()>;
}

/// SSDP search.
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    /// Runs one collection window.
    ///
    /// Each response is sent on `responses` as soon as it arrives; the sender
    /// is dropped when the window closes.
    async fn search(
        &self,
        config: &SsdpConfig,
        responses: UnboundedSender<SsdpResponse>,
    ) -> DiscoveryResult<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Combined Traits (for trait objects)
// ─────────────────────────────────────────────────────────────────────────────

/// Combined trait for all device control operations.
///
/// Used by [`Device`](crate::device::Device) and the zone coordinator to hold a
/// single client for every command.
#[async_trait]
pub trait SoundTouchClient: DeviceInfoSource + VolumeControl + KeyControl + ZoneControl {}

/// Blanket implementation for any type implementing all traits.
impl<T: DeviceInfoSource + VolumeControl + KeyControl + ZoneControl> SoundTouchClient for T {}
