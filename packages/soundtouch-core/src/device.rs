//! A single initialized SoundTouch speaker.
//!
//! A [`Device`] only exists after its `/info` document was fetched and
//! validated, so every handle carries a complete identity. Commands are sent
//! through the shared [`SoundTouchClient`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::protocol_constants::KEY_HOLD_MS;
use crate::services::volume_fade::{FadeOptions, FadePlan};
use crate::soundtouch::control::ControlError;
use crate::soundtouch::info::{DeviceInfo, NetworkInterface};
use crate::soundtouch::keys::{Key, KeyState};
use crate::soundtouch::traits::SoundTouchClient;
use crate::soundtouch::zone::Zone;
use crate::utils::{control_uri, delay};

/// Errors raised by a single device.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The `/info` query failed.
    #[error("failed to initialize {address}: {source}")]
    Unreachable {
        address: String,
        #[source]
        source: ControlError,
    },

    /// The `/info` document lacked a required field.
    #[error("failed to initialize {address}: /info has no {missing}")]
    IncompleteInfo {
        address: String,
        missing: &'static str,
    },

    /// A control command failed.
    #[error("{command} failed on {address}: {source}")]
    Command {
        address: String,
        command: String,
        #[source]
        source: ControlError,
    },
}

impl DeviceError {
    /// True for failures raised while connecting (as opposed to commands).
    pub fn is_initialization(&self) -> bool {
        !matches!(self, Self::Command { .. })
    }
}

/// Convenient Result alias for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Handle to one initialized speaker.
pub struct Device {
    address: String,
    control_uri: String,
    info: DeviceInfo,
    client: Arc<dyn SoundTouchClient>,
    key_hold: Duration,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("address", &self.address)
            .field("info", &self.info)
            .field("key_hold", &self.key_hold)
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Queries `/info` and builds the handle.
    ///
    /// Fails with [`DeviceError::Unreachable`] when the query fails and with
    /// [`DeviceError::IncompleteInfo`] when the document misses a device id,
    /// name, type or a complete primary interface.
    pub async fn connect(
        client: Arc<dyn SoundTouchClient>,
        address: impl Into<String>,
    ) -> DeviceResult<Self> {
        let address = address.into();
        let control_uri = control_uri(&address);

        let document = client
            .get_info(&control_uri)
            .await
            .map_err(|source| DeviceError::Unreachable {
                address: address.clone(),
                source,
            })?;

        let info = document
            .into_device_info()
            .map_err(|missing| DeviceError::IncompleteInfo {
                address: address.clone(),
                missing,
            })?;

        log::info!(
            "[Device] Initialized {} ({}, {}) at {}",
            info.name,
            info.device_type,
            info.device_id,
            address
        );

        Ok(Self {
            address,
            control_uri,
            info,
            client,
            key_hold: Duration::from_millis(KEY_HOLD_MS),
        })
    }

    /// Overrides the pause between key press and release.
    #[must_use]
    pub fn with_key_hold(mut self, key_hold: Duration) -> Self {
        self.key_hold = key_hold;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// `http://{address}:8090`
    pub fn control_uri(&self) -> &str {
        &self.control_uri
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn device_id(&self) -> &str {
        &self.info.device_id
    }

    pub fn device_type(&self) -> &str {
        &self.info.device_type
    }

    /// Interface announced in zone documents.
    pub fn primary(&self) -> &NetworkInterface {
        &self.info.primary
    }

    pub fn secondary(&self) -> Option<&NetworkInterface> {
        self.info.secondary.as_ref()
    }

    /// Sets the volume and returns the level that was sent.
    pub async fn volume(&self, level: u8) -> DeviceResult<u8> {
        self.client
            .set_volume(&self.control_uri, level)
            .await
            .map_err(|source| self.command_error(format!("volume {}", level), source))?;
        Ok(level)
    }

    /// Steps the volume from `options.start` to `target`.
    ///
    /// Sends one volume command per planned level and waits
    /// [`FadePlan::step_duration`] after each. Stops at the first failure.
    /// Resolves with `target`.
    pub async fn volume_fade_in(&self, target: u8, options: &FadeOptions) -> DeviceResult<u8> {
        let plan = FadePlan::new(target, options);
        log::debug!(
            "[Device] {} fading {} -> {} in {} steps of {:?}",
            self.info.name,
            options.start,
            target,
            plan.step_count(),
            plan.step_duration()
        );

        for level in plan.levels() {
            self.volume(level).await?;
            delay(plan.step_duration()).await;
        }
        Ok(plan.target())
    }

    /// Presses and releases a key, holding for the key-hold time after each.
    ///
    /// Release is not sent when the press fails.
    pub async fn key(&self, key: Key) -> DeviceResult<Key> {
        for state in [KeyState::Press, KeyState::Release] {
            self.client
                .send_key(&self.control_uri, key, state)
                .await
                .map_err(|source| {
                    self.command_error(format!("key {} {}", key, state.as_str()), source)
                })?;
            delay(self.key_hold).await;
        }
        Ok(key)
    }

    /// Sends several keys one after another.
    pub async fn key_sequence(&self, keys: &[Key]) -> DeviceResult<()> {
        for key in keys {
            self.key(*key).await?;
        }
        Ok(())
    }

    /// Creates `zone` with this device as master.
    pub async fn set_zone(&self, zone: &Zone) -> DeviceResult<()> {
        self.client
            .set_zone(&self.control_uri, zone)
            .await
            .map_err(|source| self.command_error("setZone".to_string(), source))
    }

    /// Joins this device to `zone`.
    pub async fn add_zone_slave(&self, zone: &Zone) -> DeviceResult<()> {
        self.client
            .add_zone_slave(&self.control_uri, zone)
            .await
            .map_err(|source| self.command_error("addZoneSlave".to_string(), source))
    }

    fn command_error(&self, command: String, source: ControlError) -> DeviceError {
        DeviceError::Command {
            address: self.address.clone(),
            command,
            source,
        }
    }
}
