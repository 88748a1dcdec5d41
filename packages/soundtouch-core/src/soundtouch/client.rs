//! HTTP implementation of the SoundTouch control traits.

use async_trait::async_trait;
use reqwest::Client;

use crate::soundtouch::control::{ControlRequestBuilder, ControlResult};
use crate::soundtouch::info::{parse_info_xml, InfoDocument};
use crate::soundtouch::keys::{key_body, Key, KeyState};
use crate::soundtouch::retry::with_retry;
use crate::soundtouch::traits::{DeviceInfoSource, KeyControl, VolumeControl, ZoneControl};
use crate::soundtouch::zone::Zone;

/// Concrete SoundTouch client backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct SoundTouchClientImpl {
    client: Client,
}

impl SoundTouchClientImpl {
    /// Creates a client that shares the given HTTP connection pool.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Posts an XML body, retrying transient failures.
    async fn post_idempotent(&self, endpoint: &str, path: &str, body: String) -> ControlResult<()> {
        with_retry(path, || {
            ControlRequestBuilder::new(&self.client, endpoint)
                .path(path)
                .body(body.clone())
                .send()
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DeviceInfoSource for SoundTouchClientImpl {
    async fn get_info(&self, endpoint: &str) -> ControlResult<InfoDocument> {
        let response = with_retry("/info", || {
            ControlRequestBuilder::new(&self.client, endpoint)
                .path("/info")
                .send()
        })
        .await?;

        parse_info_xml(&response)
    }
}

#[async_trait]
impl VolumeControl for SoundTouchClientImpl {
    async fn set_volume(&self, endpoint: &str, level: u8) -> ControlResult<()> {
        self.post_idempotent(endpoint, "/volume", format!("<volume>{}</volume>", level))
            .await
    }
}

#[async_trait]
impl KeyControl for SoundTouchClientImpl {
    async fn send_key(&self, endpoint: &str, key: Key, state: KeyState) -> ControlResult<()> {
        ControlRequestBuilder::new(&self.client, endpoint)
            .path("/key")
            .body(key_body(key, state))
            .send()
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ZoneControl for SoundTouchClientImpl {
    async fn set_zone(&self, endpoint: &str, zone: &Zone) -> ControlResult<()> {
        self.post_idempotent(endpoint, "/setZone", zone.to_xml()).await
    }

    async fn add_zone_slave(&self, endpoint: &str, zone: &Zone) -> ControlResult<()> {
        self.post_idempotent(endpoint, "/addZoneSlave", zone.to_xml())
            .await
    }
}
