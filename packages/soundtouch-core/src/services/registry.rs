//! Registry of initialized devices with master election.
//!
//! Devices are keyed by address and kept in insertion order; that order is the
//! order of every group command. The master is remembered as an address, so
//! it always points at a registered device.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::device::Device;

/// Outcome of [`DeviceRegistry::register`].
#[derive(Debug, Clone)]
pub enum Registration {
    /// The device was inserted.
    Added(Arc<Device>),
    /// A device with the same address was already registered; it is returned
    /// and the registry is unchanged.
    Existing(Arc<Device>),
}

impl Registration {
    /// The registered handle, whichever way it got there.
    pub fn device(&self) -> &Arc<Device> {
        match self {
            Self::Added(device) | Self::Existing(device) => device,
        }
    }

    pub fn into_device(self) -> Arc<Device> {
        match self {
            Self::Added(device) | Self::Existing(device) => device,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Added(_))
    }
}

/// Address-keyed device map plus the current master.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: IndexMap<String, Arc<Device>>,
    master: Option<String>,
    master_name: String,
}

impl DeviceRegistry {
    /// Creates an empty registry. A device whose name equals `master_name`
    /// is preferred as master; an empty name disables the preference.
    pub fn new(master_name: impl Into<String>) -> Self {
        Self {
            devices: IndexMap::new(),
            master: None,
            master_name: master_name.into(),
        }
    }

    pub fn get(&self, address: &str) -> Option<Arc<Device>> {
        self.devices.get(address).cloned()
    }

    /// Inserts `device` unless its address is already registered.
    ///
    /// On insert the master is updated: the first device becomes master, and
    /// a device carrying the master name takes over from one that does not.
    pub fn register(&mut self, device: Arc<Device>) -> Registration {
        if let Some(existing) = self.devices.get(device.address()) {
            return Registration::Existing(Arc::clone(existing));
        }

        let address = device.address().to_string();
        self.devices.insert(address.clone(), Arc::clone(&device));

        let takes_over = match self.master() {
            None => true,
            Some(current) => {
                self.is_master_name(device.name()) && !self.is_master_name(current.name())
            }
        };
        if takes_over {
            log::info!("[Registry] Master is now {} ({})", device.name(), address);
            self.master = Some(address);
        }

        Registration::Added(device)
    }

    /// Re-checks the master against the whole registry.
    ///
    /// Picks the first device (in insertion order) carrying the master name,
    /// or keeps the current master when none does. Returns true if the master
    /// changed.
    pub fn reelect_master(&mut self) -> bool {
        let preferred = self
            .devices
            .values()
            .find(|d| self.is_master_name(d.name()))
            .map(|d| d.address().to_string());

        let elected = preferred
            .or_else(|| self.master.clone())
            .or_else(|| self.devices.keys().next().cloned());

        if elected == self.master {
            return false;
        }
        if let Some(address) = &elected {
            log::info!("[Registry] Re-elected master {}", address);
        }
        self.master = elected;
        true
    }

    /// The current master.
    pub fn master(&self) -> Option<Arc<Device>> {
        self.master
            .as_deref()
            .and_then(|address| self.devices.get(address))
            .cloned()
    }

    /// All devices in insertion order.
    pub fn devices(&self) -> Vec<Arc<Device>> {
        self.devices.values().cloned().collect()
    }

    /// All devices except the master, in insertion order.
    pub fn members(&self) -> Vec<Arc<Device>> {
        self.devices
            .iter()
            .filter(|(address, _)| Some(address.as_str()) != self.master.as_deref())
            .map(|(_, device)| Arc::clone(device))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn is_master_name(&self, name: &str) -> bool {
        !self.master_name.is_empty() && name == self.master_name
    }
}
