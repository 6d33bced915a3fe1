//! The Device Registry capability: bonded-device snapshots and bonding events.
//!
//! Bonding (the OS-level pairing relationship) is managed entirely by the
//! platform; the engine only reads snapshots and reacts to `DeviceBonded`
//! events on the shared engine event channel.  A connect request for an
//! address the registry does not list as bonded is rejected locally without
//! touching the transport.

use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::info;

use hidkb_core::Device;

use super::transport::EngineEvent;

/// Read-only view of the platform's bonded-device list.
pub trait DeviceRegistry: Send + Sync {
    /// Snapshot of all currently bonded devices.
    fn list_bonded_devices(&self) -> Vec<Device>;

    /// Looks up one bonded device by address.
    fn find_bonded(&self, address: &str) -> Option<Device> {
        self.list_bonded_devices()
            .into_iter()
            .find(|d| d.address == address && d.bonded)
    }
}

/// In-memory registry, seeded from configuration and mutable from tests.
///
/// `bond` mimics the OS completing a pairing flow: the device is added to
/// the snapshot and a [`EngineEvent::DeviceBonded`] event is emitted on the
/// shared channel.
pub struct MemoryDeviceRegistry {
    devices: Mutex<Vec<Device>>,
    events: mpsc::Sender<EngineEvent>,
}

impl MemoryDeviceRegistry {
    /// Creates a registry with an initial bonded-device snapshot.
    pub fn new(devices: Vec<Device>, events: mpsc::Sender<EngineEvent>) -> Self {
        Self {
            devices: Mutex::new(devices),
            events,
        }
    }

    /// Completes bonding for `device`: updates the snapshot and emits
    /// [`EngineEvent::DeviceBonded`].
    pub fn bond(&self, device: Device) {
        info!(device = %device, "registry: device bonded");
        {
            let mut devices = self.devices.lock().expect("lock poisoned");
            devices.retain(|d| d.address != device.address);
            devices.push(device.clone());
        }
        let _ = self.events.try_send(EngineEvent::DeviceBonded(device));
    }
}

impl DeviceRegistry for MemoryDeviceRegistry {
    fn list_bonded_devices(&self) -> Vec<Device> {
        self.devices.lock().expect("lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_registry(devices: Vec<Device>) -> (MemoryDeviceRegistry, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(64);
        (MemoryDeviceRegistry::new(devices, tx), rx)
    }

    #[test]
    fn test_list_returns_seeded_devices() {
        let seed = vec![Device::bonded("AA:BB:CC:DD:EE:01", "laptop")];
        let (registry, _rx) = make_registry(seed.clone());
        assert_eq!(registry.list_bonded_devices(), seed);
    }

    #[test]
    fn test_find_bonded_matches_by_address() {
        let (registry, _rx) = make_registry(vec![
            Device::bonded("AA:BB:CC:DD:EE:01", "laptop"),
            Device::bonded("AA:BB:CC:DD:EE:02", "phone"),
        ]);

        let found = registry.find_bonded("AA:BB:CC:DD:EE:02");
        assert_eq!(found.map(|d| d.name), Some("phone".to_string()));
        assert!(registry.find_bonded("AA:BB:CC:DD:EE:99").is_none());
    }

    #[test]
    fn test_find_bonded_ignores_unbonded_entries() {
        let unbonded = Device {
            address: "AA:BB:CC:DD:EE:03".to_string(),
            name: "seen but never paired".to_string(),
            bonded: false,
        };
        let (registry, _rx) = make_registry(vec![unbonded]);
        assert!(registry.find_bonded("AA:BB:CC:DD:EE:03").is_none());
    }

    #[tokio::test]
    async fn test_bond_adds_device_and_emits_event() {
        // Arrange
        let (registry, mut rx) = make_registry(Vec::new());
        let device = Device::bonded("AA:BB:CC:DD:EE:04", "tablet");

        // Act
        registry.bond(device.clone());

        // Assert
        assert_eq!(registry.find_bonded(&device.address), Some(device.clone()));
        match rx.recv().await {
            Some(EngineEvent::DeviceBonded(d)) => assert_eq!(d, device),
            other => panic!("expected DeviceBonded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bond_replaces_existing_entry_for_same_address() {
        let (registry, _rx) = make_registry(vec![Device::bonded("AA:BB:CC:DD:EE:05", "old name")]);

        registry.bond(Device::bonded("AA:BB:CC:DD:EE:05", "new name"));

        let devices = registry.list_bonded_devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "new name");
    }
}
