//! `/info` response parsing.
//!
//! The device answers `GET /info` with a document like:
//!
//! ```xml
//! <info deviceID="A0F6FD1E2A3B">
//!   <name>Working</name>
//!   <type>SoundTouch 10</type>
//!   <networkInfo type="SCM"><macAddress>A0F6FD1E2A3B</macAddress><ipAddress>192.168.1.20</ipAddress></networkInfo>
//!   <networkInfo type="SMSC"><macAddress>A0F6FD1E2A3C</macAddress><ipAddress>192.168.1.21</ipAddress></networkInfo>
//! </info>
//! ```
//!
//! Parsing is lenient: every field is optional at this layer. Deciding
//! whether the document is complete enough to trust belongs to
//! [`Device::connect`](crate::device::Device::connect).

use serde::{Deserialize, Serialize};

use crate::soundtouch::control::{ControlError, ControlResult};

/// Raw `/info` document with every field optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename = "info")]
pub struct InfoDocument {
    #[serde(rename = "@deviceID")]
    pub device_id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    #[serde(rename = "networkInfo", default)]
    pub network_info: Vec<NetworkInfoElement>,
}

/// One `<networkInfo>` record.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct NetworkInfoElement {
    #[serde(rename = "@type")]
    pub kind: Option<String>,
    #[serde(rename = "macAddress")]
    pub mac_address: Option<String>,
    #[serde(rename = "ipAddress")]
    pub ip_address: Option<String>,
}

impl NetworkInfoElement {
    /// Returns the interface if both MAC and IP are present and non-empty.
    pub fn to_interface(&self) -> Option<NetworkInterface> {
        let mac = non_empty(self.mac_address.as_deref())?;
        let ip = non_empty(self.ip_address.as_deref())?;
        Some(NetworkInterface {
            mac: mac.to_string(),
            ip: ip.to_string(),
        })
    }
}

/// A `(MAC, IP)` pair of one physical network interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInterface {
    pub mac: String,
    pub ip: String,
}

/// Validated identity of an initialized device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_id: String,
    pub name: String,
    pub device_type: String,
    /// Interface used for zone membership.
    pub primary: NetworkInterface,
    /// Second interface, absent on single-interface models.
    pub secondary: Option<NetworkInterface>,
}

impl InfoDocument {
    /// Validates the document into a [`DeviceInfo`].
    ///
    /// Returns the name of the first missing field on failure. The primary
    /// interface is the first `<networkInfo>` record and must be complete;
    /// the secondary one is kept only when it is complete too.
    pub fn into_device_info(self) -> Result<DeviceInfo, &'static str> {
        let device_id = non_empty(self.device_id.as_deref()).ok_or("deviceID")?;
        let name = non_empty(self.name.as_deref()).ok_or("name")?;
        let device_type = non_empty(self.device_type.as_deref()).ok_or("type")?;
        let primary = self
            .network_info
            .first()
            .and_then(NetworkInfoElement::to_interface)
            .ok_or("networkInfo")?;
        let secondary = self
            .network_info
            .get(1)
            .and_then(NetworkInfoElement::to_interface);

        Ok(DeviceInfo {
            device_id: device_id.to_string(),
            name: name.to_string(),
            device_type: device_type.to_string(),
            primary,
            secondary,
        })
    }
}

/// Parses the body of a `GET /info` response.
pub fn parse_info_xml(xml: &str) -> ControlResult<InfoDocument> {
    quick_xml::de::from_str(xml).map_err(|e| ControlError::Parse(e.to_string()))
}

/// Returns the trimmed value if it is not blank.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
