//! SSDP discovery of SoundTouch speakers.
//!
//! - `ssdp` - M-SEARCH client streaming responses during a collection window
//! - `types` - Responses, errors and interface filtering shared by the client

pub mod ssdp;
pub mod types;

pub use ssdp::{get_interfaces, parse_ssdp_response, SsdpClient, SsdpConfig};
pub use types::{DiscoveryError, DiscoveryMethod, DiscoveryResult, SsdpResponse};
