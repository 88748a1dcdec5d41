//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the SoundTouch control API and the UPnP/SSDP
//! protocol. Tunable timing lives in [`crate::state::ControllerConfig`].

// ─────────────────────────────────────────────────────────────────────────────
// SoundTouch Control API
// ─────────────────────────────────────────────────────────────────────────────

/// TCP port of the SoundTouch HTTP control endpoint.
pub const CONTROL_PORT: u16 = 8090;

/// Sender identifier included in every `/key` request.
///
/// The device rejects key presses without a sender attribute.
pub const KEY_SENDER: &str = "Gabbo";

/// Default delay after a key press and after its release (milliseconds).
///
/// SoundTouch devices drop commands that arrive closer together than this.
pub const KEY_HOLD_MS: u64 = 200;

// ─────────────────────────────────────────────────────────────────────────────
// SSDP
// ─────────────────────────────────────────────────────────────────────────────

/// SSDP search target advertised by SoundTouch speakers.
pub const MEDIA_RENDERER_SEARCH_TARGET: &str = "urn:schemas-upnp-org:device:MediaRenderer:1";

/// SSDP port.
pub const SSDP_PORT: u16 = 1900;

/// Standard SSDP multicast group.
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// Limited broadcast address for fallback.
pub const SSDP_LIMITED_BROADCAST_ADDR: &str = "255.255.255.255:1900";

// ─────────────────────────────────────────────────────────────────────────────
// HTTP
// ─────────────────────────────────────────────────────────────────────────────

/// Timeout for control HTTP requests (seconds).
///
/// 10 seconds is reasonable for LAN operations.
pub const CONTROL_TIMEOUT_SECS: u64 = 10;
