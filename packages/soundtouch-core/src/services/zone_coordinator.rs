//! Zone coordinator: discovery, registration and group commands.
//!
//! The coordinator owns the [`DeviceRegistry`] and is the only place devices
//! enter it. Group commands take a snapshot of the registry when they start
//! and visit devices strictly one after another in insertion order: each
//! device's command resolves before the next device is contacted, and the
//! first failure stops the round.
//!
//! Discovery runs the SSDP collection window and the fallback address probes
//! side by side. Every discovered or probed address goes through
//! [`ZoneCoordinator::add_device`], which absorbs initialization failures so
//! that one unreachable speaker never aborts discovery.

use std::collections::HashSet;
use std::future::ready;
use std::sync::Arc;

use futures::future::join_all;
use futures::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::device::{Device, DeviceResult};
use crate::error::{LogFailure, SoundTouchError, SoundTouchResult};
use crate::services::registry::{DeviceRegistry, Registration};
use crate::services::volume_fade::{FadeOptions, FadePlan};
use crate::soundtouch::discovery::SsdpResponse;
use crate::soundtouch::keys::Key;
use crate::soundtouch::traits::{DeviceDiscovery, SoundTouchClient};
use crate::soundtouch::zone::Zone;
use crate::state::ControllerConfig;
use crate::utils::delay;

/// Result of [`ZoneCoordinator::group_zone`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneReport {
    /// Address of the zone master.
    pub master: String,
    /// The zone document that was sent.
    pub zone: Zone,
    /// Members that accepted `/addZoneSlave`, in registry order.
    pub joined: Vec<String>,
    /// Members that rejected `/addZoneSlave`, with the error message.
    pub failed: Vec<SlaveFailure>,
}

impl ZoneReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A member that could not be joined to the zone.
#[derive(Debug, Clone, Serialize)]
pub struct SlaveFailure {
    pub address: String,
    pub error: String,
}

/// Discovers speakers and drives them as one group.
pub struct ZoneCoordinator {
    client: Arc<dyn SoundTouchClient>,
    discovery: Arc<dyn DeviceDiscovery>,
    config: ControllerConfig,
    registry: Mutex<DeviceRegistry>,
}

impl ZoneCoordinator {
    /// Creates a coordinator with an empty registry.
    pub fn new(
        client: Arc<dyn SoundTouchClient>,
        discovery: Arc<dyn DeviceDiscovery>,
        config: ControllerConfig,
    ) -> Self {
        let registry = DeviceRegistry::new(config.master_name.clone());
        Self {
            client,
            discovery,
            config,
            registry: Mutex::new(registry),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The current zone master.
    pub fn master(&self) -> Option<Arc<Device>> {
        self.registry.lock().master()
    }

    /// Registered devices in insertion order.
    pub fn devices(&self) -> Vec<Arc<Device>> {
        self.registry.lock().devices()
    }

    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.lock().is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────

    /// Initializes the device at `address` and registers it.
    ///
    /// An address that is already registered is returned as
    /// [`Registration::Existing`] without querying the device again.
    pub async fn try_add_device(&self, address: &str) -> DeviceResult<Registration> {
        if let Some(existing) = self.registry.lock().get(address) {
            log::debug!("[Zone] {} already registered", address);
            return Ok(Registration::Existing(existing));
        }

        let device = Device::connect(Arc::clone(&self.client), address)
            .await?
            .with_key_hold(self.config.key_hold());

        let registration = self.registry.lock().register(Arc::new(device));
        if registration.is_new() {
            log::info!(
                "[Zone] Registered {} at {}",
                registration.device().name(),
                address
            );
        }
        Ok(registration)
    }

    /// Like [`try_add_device`](Self::try_add_device), but logs and absorbs
    /// initialization failures.
    pub async fn add_device(&self, address: &str) -> Option<Arc<Device>> {
        self.try_add_device(address)
            .await
            .absorbed("Zone")
            .map(Registration::into_device)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Discovery
    // ─────────────────────────────────────────────────────────────────────────

    /// Runs one discovery pass and returns the elected master.
    ///
    /// Resolves after the collection window has closed and every fallback
    /// probe and registration started during it has finished. Only
    /// `200 OK` responses are registered, each address at most once per pass.
    /// Fails only when discovery itself cannot start.
    pub async fn detect(&self) -> SoundTouchResult<Option<Arc<Device>>> {
        self.run_detection().await.logged("Discovery")
    }

    async fn run_detection(&self) -> SoundTouchResult<Option<Arc<Device>>> {
        let ssdp = self.config.discovery.to_ssdp_config();
        log::info!(
            "[Discovery] Searching for {} ({} rounds, {:?} window, {} fallback addresses)",
            ssdp.search_target,
            ssdp.rounds,
            ssdp.collection_window(),
            self.config.fallback_addresses.len()
        );

        let (tx, rx) = mpsc::unbounded_channel::<SsdpResponse>();

        let mut seen = HashSet::new();
        let registrations = UnboundedReceiverStream::new(rx)
            .filter_map(move |response| {
                let address = response.address().to_string();
                let accept = response.is_success() && seen.insert(address.clone());
                if !accept {
                    log::debug!(
                        "[Discovery] Ignoring response from {} (status {})",
                        address,
                        response.status
                    );
                }
                ready(accept.then_some(address))
            })
            .for_each_concurrent(None, |address| async move {
                self.add_device(&address).await;
            });

        let fallbacks = join_all(
            self.config
                .fallback_addresses
                .iter()
                .map(|address| self.add_device(address.trim())),
        );

        let (search, (), _) =
            tokio::join!(self.discovery.search(&ssdp, tx), registrations, fallbacks);
        search?;

        let master = {
            let mut registry = self.registry.lock();
            registry.reelect_master();
            registry.master()
        };

        match &master {
            Some(m) => log::info!(
                "[Discovery] Found {} device(s), master {} ({})",
                self.len(),
                m.name(),
                m.address()
            ),
            None => log::warn!("[Discovery] No devices found"),
        }
        Ok(master)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Zone
    // ─────────────────────────────────────────────────────────────────────────

    /// Groups every registered device under the master.
    ///
    /// Sends `/setZone` to the master; a failure there fails the call. Then
    /// sends `/addZoneSlave` to each member in order; member failures are
    /// logged and collected in the report.
    pub async fn group_zone(&self) -> SoundTouchResult<ZoneReport> {
        let (master, members) = {
            let registry = self.registry.lock();
            let master = registry.master().ok_or(SoundTouchError::NoMaster)?;
            (master, registry.members())
        };

        let zone = Zone {
            master: master.primary().clone(),
            members: members.iter().map(|m| m.primary().clone()).collect(),
        };
        log::info!(
            "[Zone] Grouping {} member(s) under {}",
            zone.members.len(),
            master.name()
        );

        master.set_zone(&zone).await.logged("Zone")?;

        let mut joined = Vec::new();
        let mut failed = Vec::new();
        for member in &members {
            match member.add_zone_slave(&zone).await {
                Ok(()) => joined.push(member.address().to_string()),
                Err(e) => {
                    log::warn!("[Zone] {}", e);
                    failed.push(SlaveFailure {
                        address: member.address().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(ZoneReport {
            master: master.address().to_string(),
            zone,
            joined,
            failed,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Group Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Sends `key` to every device in turn.
    pub async fn key(&self, key: Key) -> SoundTouchResult<Key> {
        for device in self.round("key") {
            device.key(key).await.logged("Zone")?;
        }
        Ok(key)
    }

    /// Sends each key to the whole group before moving to the next key.
    pub async fn key_sequence(&self, keys: &[Key]) -> SoundTouchResult<()> {
        for key in keys {
            self.key(*key).await?;
        }
        Ok(())
    }

    /// Sets `level` on every device in turn.
    pub async fn volume(&self, level: u8) -> SoundTouchResult<u8> {
        for device in self.round("volume") {
            device.volume(level).await.logged("Zone")?;
        }
        Ok(level)
    }

    /// Fades the whole group towards `target`.
    ///
    /// Each planned level is sent to every device in turn, followed by one
    /// step pause. Resolves with `target`; an empty registry resolves at once.
    pub async fn volume_fade_in(&self, target: u8, options: &FadeOptions) -> SoundTouchResult<u8> {
        let devices = self.round("fade");
        let plan = FadePlan::new(target, options);
        if devices.is_empty() {
            return Ok(plan.target());
        }
        log::info!(
            "[Zone] Fading {} device(s) {} -> {} in {} steps",
            devices.len(),
            options.start,
            target,
            plan.step_count()
        );

        for level in plan.levels() {
            for device in &devices {
                device.volume(level).await.logged("Zone")?;
            }
            delay(plan.step_duration()).await;
        }
        Ok(plan.target())
    }

    /// Snapshot of the devices one group command visits.
    fn round(&self, command: &str) -> Vec<Arc<Device>> {
        let devices = self.devices();
        if devices.is_empty() {
            log::warn!("[Zone] No devices registered for {}", command);
        }
        devices
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::device::DeviceError;
    use crate::soundtouch::keys::KeyState;
    use crate::soundtouch::test_fixtures::{
        ssdp_ok, ssdp_response, Call, MockDiscovery, MockSoundTouchClient,
    };

    const OFFICE: &str = "192.168.1.10";
    const WORKING: &str = "192.168.1.20";
    const KITCHEN: &str = "192.168.1.30";

    fn uri(address: &str) -> String {
        format!("http://{}:8090", address)
    }

    fn config() -> ControllerConfig {
        ControllerConfig {
            master_name: "Working".to_string(),
            ..ControllerConfig::default()
        }
    }

    fn coordinator(mock: &Arc<MockSoundTouchClient>, discovery: MockDiscovery) -> ZoneCoordinator {
        ZoneCoordinator::new(
            Arc::clone(mock) as Arc<dyn SoundTouchClient>,
            Arc::new(discovery),
            config(),
        )
    }

    fn three_speakers() -> Arc<MockSoundTouchClient> {
        Arc::new(
            MockSoundTouchClient::new()
                .with_device(OFFICE, "0FF1CE000001", "Office")
                .with_device(WORKING, "A0F6FD1E2A3B", "Working")
                .with_device(KITCHEN, "C0FFEE000003", "Kitchen"),
        )
    }

    async fn registered(mock: &Arc<MockSoundTouchClient>, addresses: &[&str]) -> ZoneCoordinator {
        let zone = coordinator(mock, MockDiscovery::default());
        for address in addresses {
            zone.try_add_device(address).await.expect("device should register");
        }
        zone
    }

    fn names(devices: &[Arc<Device>]) -> Vec<&str> {
        devices.iter().map(|d| d.name()).collect()
    }

    #[tokio::test]
    async fn working_takes_over_master_from_office() {
        let mock = three_speakers();
        let zone = registered(&mock, &[OFFICE, WORKING]).await;

        let master = zone.master().expect("master");
        assert_eq!(master.name(), "Working");
        assert_eq!(names(&zone.devices()), vec!["Office", "Working"]);
    }

    #[tokio::test]
    async fn failed_info_query_is_absorbed() {
        let mock = three_speakers();
        let zone = coordinator(&mock, MockDiscovery::default());

        assert!(zone.add_device("192.168.1.99").await.is_none());
        assert!(zone.is_empty());
        assert!(zone.master().is_none());

        let err = zone
            .try_add_device("192.168.1.99")
            .await
            .expect_err("unreachable");
        assert!(err.is_initialization());
    }

    #[tokio::test]
    async fn adding_same_address_twice_is_idempotent() {
        let mock = three_speakers();
        let zone = registered(&mock, &[OFFICE]).await;

        let again = zone.try_add_device(OFFICE).await.expect("existing");
        assert!(!again.is_new());
        assert_eq!(zone.len(), 1);
        assert_eq!(mock.info_queries(), 1);
    }

    #[tokio::test]
    async fn volume_visits_devices_in_insertion_order() {
        let mock = three_speakers();
        let zone = registered(&mock, &[OFFICE, WORKING, KITCHEN]).await;

        assert_eq!(zone.volume(30).await.expect("volume"), 30);
        assert_eq!(
            mock.commands(),
            vec![
                Call::Volume(uri(OFFICE), 30),
                Call::Volume(uri(WORKING), 30),
                Call::Volume(uri(KITCHEN), 30),
            ]
        );
    }

    #[tokio::test]
    async fn group_command_stops_at_first_failure() {
        let mock = Arc::new(
            MockSoundTouchClient::new()
                .with_device(OFFICE, "0FF1CE000001", "Office")
                .with_device(WORKING, "A0F6FD1E2A3B", "Working")
                .with_device(KITCHEN, "C0FFEE000003", "Kitchen")
                .failing_commands(WORKING),
        );
        let zone = registered(&mock, &[OFFICE, WORKING, KITCHEN]).await;

        let err = zone.volume(30).await.expect_err("second device fails");
        assert!(matches!(err, SoundTouchError::Device(DeviceError::Command { .. })));
        assert_eq!(
            mock.commands(),
            vec![Call::Volume(uri(OFFICE), 30), Call::Volume(uri(WORKING), 30)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn key_presses_each_device_fully_before_the_next() {
        let mock = three_speakers();
        let zone = registered(&mock, &[OFFICE, WORKING]).await;

        let start = Instant::now();
        assert_eq!(zone.key(Key::Preset1).await.expect("key"), Key::Preset1);
        assert_eq!(start.elapsed(), Duration::from_millis(800));
        assert_eq!(
            mock.commands(),
            vec![
                Call::Key(uri(OFFICE), Key::Preset1, KeyState::Press),
                Call::Key(uri(OFFICE), Key::Preset1, KeyState::Release),
                Call::Key(uri(WORKING), Key::Preset1, KeyState::Press),
                Call::Key(uri(WORKING), Key::Preset1, KeyState::Release),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn key_sequence_sends_keys_in_order() {
        let mock = three_speakers();
        let zone = registered(&mock, &[OFFICE]).await;

        zone.key_sequence(&[Key::Power, Key::Preset2])
            .await
            .expect("sequence");
        let keys: Vec<_> = mock
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                Call::Key(_, key, KeyState::Press) => Some(key),
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec![Key::Power, Key::Preset2]);
    }

    #[tokio::test]
    async fn commands_on_empty_registry_do_nothing() {
        let mock = three_speakers();
        let zone = coordinator(&mock, MockDiscovery::default());

        assert_eq!(zone.volume(10).await.expect("volume"), 10);
        assert!(mock.calls().is_empty());
        assert!(matches!(zone.group_zone().await, Err(SoundTouchError::NoMaster)));
    }

    #[tokio::test(start_paused = true)]
    async fn fade_on_empty_registry_returns_immediately() {
        let mock = three_speakers();
        let zone = coordinator(&mock, MockDiscovery::default());

        let start = Instant::now();
        let level = zone
            .volume_fade_in(20, &FadeOptions::default())
            .await
            .expect("fade");
        assert_eq!(level, 20);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn group_zone_sends_master_then_members() {
        let mock = three_speakers();
        let zone = registered(&mock, &[OFFICE, WORKING, KITCHEN]).await;

        let report = zone.group_zone().await.expect("zone");
        assert_eq!(report.master, WORKING);
        assert_eq!(report.joined, vec![OFFICE, KITCHEN]);
        assert!(report.is_complete());

        let expected = format!(
            r#"<zone master="A0F6FD1E2A3B" senderIPAddress="{}"><member ipaddress="{}">0FF1CE000001</member><member ipaddress="{}">C0FFEE000003</member></zone>"#,
            WORKING, OFFICE, KITCHEN
        );
        assert_eq!(
            mock.commands(),
            vec![
                Call::SetZone(uri(WORKING), expected.clone()),
                Call::AddZoneSlave(uri(OFFICE), expected.clone()),
                Call::AddZoneSlave(uri(KITCHEN), expected),
            ]
        );
    }

    #[tokio::test]
    async fn group_zone_collects_member_failures() {
        let mock = Arc::new(
            MockSoundTouchClient::new()
                .with_device(OFFICE, "0FF1CE000001", "Office")
                .with_device(WORKING, "A0F6FD1E2A3B", "Working")
                .with_device(KITCHEN, "C0FFEE000003", "Kitchen")
                .failing_commands(OFFICE),
        );
        let zone = registered(&mock, &[OFFICE, WORKING, KITCHEN]).await;

        let report = zone.group_zone().await.expect("master accepted zone");
        assert_eq!(report.joined, vec![KITCHEN]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].address, OFFICE);
    }

    #[tokio::test]
    async fn group_zone_fails_when_master_rejects() {
        let mock = Arc::new(
            MockSoundTouchClient::new()
                .with_device(WORKING, "A0F6FD1E2A3B", "Working")
                .with_device(KITCHEN, "C0FFEE000003", "Kitchen")
                .failing_commands(WORKING),
        );
        let zone = registered(&mock, &[WORKING, KITCHEN]).await;

        assert!(zone.group_zone().await.is_err());
        assert_eq!(mock.commands().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn group_fade_sends_each_level_to_all_devices() {
        let mock = three_speakers();
        let zone = registered(&mock, &[OFFICE, KITCHEN]).await;
        let options = FadeOptions {
            start: 10,
            duration: Duration::from_millis(3000),
            step: 1,
        };

        let start = Instant::now();
        assert_eq!(zone.volume_fade_in(13, &options).await.expect("fade"), 13);
        assert_eq!(start.elapsed(), Duration::from_millis(3000));

        let levels: Vec<_> = mock
            .commands()
            .into_iter()
            .map(|c| match c {
                Call::Volume(endpoint, level) => (endpoint, level),
                other => panic!("unexpected call {:?}", other),
            })
            .collect();
        assert_eq!(
            levels,
            vec![
                (uri(OFFICE), 11),
                (uri(KITCHEN), 11),
                (uri(OFFICE), 12),
                (uri(KITCHEN), 12),
                (uri(OFFICE), 13),
                (uri(KITCHEN), 13),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn detect_registers_responders_and_fallbacks() {
        let mock = three_speakers();
        let discovery = MockDiscovery::new(vec![
            (Duration::from_millis(100), ssdp_ok(OFFICE)),
            (Duration::from_millis(300), ssdp_ok(OFFICE)),
            (Duration::from_millis(500), ssdp_response(KITCHEN, 404)),
            (Duration::from_millis(2500), ssdp_ok(KITCHEN)),
        ]);
        let zone = ZoneCoordinator::new(
            Arc::clone(&mock) as Arc<dyn SoundTouchClient>,
            Arc::new(discovery),
            ControllerConfig {
                fallback_addresses: vec![WORKING.to_string(), "192.168.1.99".to_string()],
                ..config()
            },
        );

        let start = Instant::now();
        let master = zone.detect().await.expect("detect").expect("master");
        assert_eq!(start.elapsed(), Duration::from_millis(6000));

        assert_eq!(master.name(), "Working");
        assert_eq!(zone.len(), 3);
        assert_eq!(mock.info_queries(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn detect_with_no_responses_has_no_master() {
        let mock = three_speakers();
        let zone = coordinator(&mock, MockDiscovery::default());

        assert!(zone.detect().await.expect("detect").is_none());
        assert!(zone.is_empty());
    }

    #[tokio::test]
    async fn detect_fails_when_discovery_cannot_start() {
        let mock = three_speakers();
        let zone = coordinator(&mock, MockDiscovery::failing());

        let err = zone.detect().await.expect_err("setup failure");
        assert!(matches!(err, SoundTouchError::Discovery(_)));
    }
}
