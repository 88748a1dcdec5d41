//! Shared test doubles for device and coordinator tests.
//!
//! `MockSoundTouchClient` records every control call with its (paused-clock)
//! timestamp; `MockDiscovery` replays scripted SSDP responses.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

use crate::soundtouch::control::{ControlError, ControlResult};
use crate::soundtouch::discovery::{DiscoveryError, DiscoveryResult, SsdpConfig, SsdpResponse};
use crate::soundtouch::info::fixtures::info_xml;
use crate::soundtouch::info::{parse_info_xml, InfoDocument};
use crate::soundtouch::keys::{Key, KeyState};
use crate::soundtouch::traits::{
    DeviceDiscovery, DeviceInfoSource, KeyControl, VolumeControl, ZoneControl,
};
use crate::soundtouch::zone::Zone;
use crate::utils::control_uri;

/// One recorded control call. The first field is always the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Info(String),
    Volume(String, u8),
    Key(String, Key, KeyState),
    SetZone(String, String),
    AddZoneSlave(String, String),
}

/// Scriptable in-memory SoundTouch client.
#[derive(Default)]
pub struct MockSoundTouchClient {
    infos: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(Instant, Call)>>,
}

impl MockSoundTouchClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reachable device answering `/info` with a complete document.
    pub fn with_device(self, address: &str, device_id: &str, name: &str) -> Self {
        self.with_info(address, &info_xml(device_id, name, address))
    }

    /// Registers a raw `/info` body for `address`.
    pub fn with_info(self, address: &str, xml: &str) -> Self {
        self.infos.lock().insert(control_uri(address), xml.to_string());
        self
    }

    /// Makes every command (not `/info`) sent to `address` fail.
    pub fn failing_commands(self, address: &str) -> Self {
        self.failing.lock().insert(control_uri(address));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, Call)> {
        self.calls.lock().clone()
    }

    pub fn info_queries(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Info(_)))
            .count()
    }

    /// Non-`/info` calls in the order they were sent.
    pub fn commands(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Info(_)))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push((Instant::now(), call));
    }

    fn command_result(&self, endpoint: &str) -> ControlResult<()> {
        if self.failing.lock().contains(endpoint) {
            return Err(ControlError::Device("simulated failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceInfoSource for MockSoundTouchClient {
    async fn get_info(&self, endpoint: &str) -> ControlResult<InfoDocument> {
        self.record(Call::Info(endpoint.to_string()));
        let xml = self.infos.lock().get(endpoint).cloned();
        match xml {
            Some(xml) => parse_info_xml(&xml),
            None => Err(ControlError::HttpStatus(504, "no route to host".to_string())),
        }
    }
}

#[async_trait]
impl VolumeControl for MockSoundTouchClient {
    async fn set_volume(&self, endpoint: &str, level: u8) -> ControlResult<()> {
        self.record(Call::Volume(endpoint.to_string(), level));
        self.command_result(endpoint)
    }
}

#[async_trait]
impl KeyControl for MockSoundTouchClient {
    async fn send_key(&self, endpoint: &str, key: Key, state: KeyState) -> ControlResult<()> {
        self.record(Call::Key(endpoint.to_string(), key, state));
        self.command_result(endpoint)
    }
}

#[async_trait]
impl ZoneControl for MockSoundTouchClient {
    async fn set_zone(&self, endpoint: &str, zone: &Zone) -> ControlResult<()> {
        self.record(Call::SetZone(endpoint.to_string(), zone.to_xml()));
        self.command_result(endpoint)
    }

    async fn add_zone_slave(&self, endpoint: &str, zone: &Zone) -> ControlResult<()> {
        self.record(Call::AddZoneSlave(endpoint.to_string(), zone.to_xml()));
        self.command_result(endpoint)
    }
}

/// Builds a `200 OK` SSDP response from `address`.
pub fn ssdp_ok(address: &str) -> SsdpResponse {
    ssdp_response(address, 200)
}

pub fn ssdp_response(address: &str, status: u16) -> SsdpResponse {
    let remote: SocketAddr = format!("{}:1900", address)
        .parse()
        .expect("test address must be an IPv4 literal");
    SsdpResponse {
        status,
        headers: vec![(
            "ST".to_string(),
            "urn:schemas-upnp-org:device:MediaRenderer:1".to_string(),
        )],
        remote,
    }
}

/// Replays scripted responses at fixed offsets into the collection window.
#[derive(Default)]
pub struct MockDiscovery {
    script: Vec<(Duration, SsdpResponse)>,
    fail_setup: bool,
}

impl MockDiscovery {
    pub fn new(script: Vec<(Duration, SsdpResponse)>) -> Self {
        Self {
            script,
            fail_setup: false,
        }
    }

    /// A discovery whose socket setup always fails.
    pub fn failing() -> Self {
        Self {
            script: Vec::new(),
            fail_setup: true,
        }
    }
}

#[async_trait]
impl DeviceDiscovery for MockDiscovery {
    async fn search(
        &self,
        config: &SsdpConfig,
        responses: UnboundedSender<SsdpResponse>,
    ) -> DiscoveryResult<()> {
        if self.fail_setup {
            return Err(DiscoveryError::NoInterfaces);
        }

        let start = Instant::now();
        for (offset, response) in &self.script {
            tokio::time::sleep_until(start + *offset).await;
            let _ = responses.send(response.clone());
        }
        tokio::time::sleep_until(start + config.collection_window()).await;
        Ok(())
    }
}
