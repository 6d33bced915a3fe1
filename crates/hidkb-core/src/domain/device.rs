//! Snapshot of a host device known to the Device Registry.

use serde::{Deserialize, Serialize};

/// A host device as reported by the Device Registry collaborator.
///
/// The core never mutates devices; it only reads snapshots.  `address` is the
/// unique hardware identifier (a Bluetooth MAC like `"AA:BB:CC:DD:EE:FF"` or
/// whatever the transport uses), `name` is the human-readable label shown to
/// the user, and `bonded` reflects the OS-level pairing relationship, which
/// is distinct from an active profile connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Unique hardware identifier.
    pub address: String,
    /// Display name.
    pub name: String,
    /// Whether the OS considers this device bonded.
    pub bonded: bool,
}

impl Device {
    /// Creates a bonded device snapshot.
    pub fn bonded(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            bonded: true,
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bonded_constructor_sets_flag() {
        let device = Device::bonded("AA:BB:CC:DD:EE:FF", "Desk Laptop");
        assert!(device.bonded);
        assert_eq!(device.address, "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_display_shows_name_and_address() {
        let device = Device::bonded("AA:BB:CC:DD:EE:FF", "Desk Laptop");
        assert_eq!(device.to_string(), "Desk Laptop (AA:BB:CC:DD:EE:FF)");
    }
}
