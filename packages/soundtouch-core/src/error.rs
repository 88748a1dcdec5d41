//! Centralized error types for the SoundTouch core library.
//!
//! This module provides:
//! - The crate-wide [`SoundTouchError`] built with `thiserror`
//! - Machine-readable error codes via [`ErrorCode`]
//! - [`LogFailure`], the single point where failures are logged before they
//!   are either propagated or absorbed

use std::fmt::Display;

use thiserror::Error;

use crate::device::DeviceError;
use crate::soundtouch::control::ControlError;
use crate::soundtouch::discovery::DiscoveryError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::SocketBind(_) => "socket_bind_failed",
            Self::NoInterfaces => "no_network_interfaces",
            Self::SendFailed(_) => "ssdp_send_failed",
        }
    }
}

impl ErrorCode for ControlError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus(_, _) => "http_error_status",
            Self::Device(_) => "device_error",
            Self::Parse(_) => "response_parse_error",
        }
    }
}

impl ErrorCode for DeviceError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "device_unreachable",
            Self::IncompleteInfo { .. } => "device_info_incomplete",
            Self::Command { .. } => "command_failed",
        }
    }
}

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum SoundTouchError {
    /// Discovery setup failed (sockets, interfaces).
    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    /// A device failed to initialize or rejected a command.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// A zone operation needs a master but no device is registered.
    #[error("no master device registered")]
    NoMaster,

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ErrorCode for SoundTouchError {
    fn code(&self) -> &'static str {
        match self {
            Self::Discovery(e) => e.code(),
            Self::Device(e) => e.code(),
            Self::NoMaster => "no_master",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type SoundTouchResult<T> = Result<T, SoundTouchError>;

// ─────────────────────────────────────────────────────────────────────────────
// Failure Normalization
// ─────────────────────────────────────────────────────────────────────────────

/// Logs a failure with a context label, then propagates or absorbs it.
///
/// ```ignore
/// // Propagate: log, keep the error
/// device.volume(30).await.logged("Zone")?;
///
/// // Absorb: log, turn the error into `None`
/// let device = Device::connect(client, addr).await.absorbed("Discovery");
/// ```
pub trait LogFailure<T> {
    /// Logs the error (if any) at error level and returns the result unchanged.
    fn logged(self, context: &str) -> Self;

    /// Logs the error (if any) at warn level and converts the result to an `Option`.
    fn absorbed(self, context: &str) -> Option<T>;
}

impl<T, E: Display> LogFailure<T> for Result<T, E> {
    fn logged(self, context: &str) -> Self {
        if let Err(ref e) = self {
            log::error!("[{}] {}", context, e);
        }
        self
    }

    fn absorbed(self, context: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("[{}] {}", context, e);
                None
            }
        }
    }
}
