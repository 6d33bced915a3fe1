//! The Transport capability: how the engine reaches the HID link layer.
//!
//! The real radio/profile plumbing (BlueZ, `BluetoothHidDevice`, a USB
//! gadget, ...) lives outside the core.  The engine only ever sees this
//! trait plus a single ordered stream of [`EngineEvent`]s, so the whole
//! state machine can be exercised with synthetic events and an in-process
//! loopback transport.
//!
//! # Event delivery
//!
//! Platform HID stacks deliver profile callbacks on their own notification
//! threads.  Instead of exposing that inversion-of-control surface, every
//! adapter is handed one `mpsc::Sender<EngineEvent>` at construction and
//! funnels *all* notifications through it — registration confirmations,
//! link-state changes, transport failures, and (from the registry side)
//! bonding events.  One channel means one ordering, which keeps the state
//! machine's transition table exhaustive and testable.

pub mod loopback;

use async_trait::async_trait;
use thiserror::Error;

use hidkb_core::{Device, InputReport};

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport as a whole is unusable (radio off, profile unsupported).
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// HID profile registration was rejected.
    #[error("registration failed: {0}")]
    RegistrationFailed(String),

    /// A connection attempt could not be started.
    #[error("connect to {address} failed: {reason}")]
    ConnectFailed { address: String, reason: String },

    /// A report could not be delivered (typically the link dropped mid-send).
    #[error("report send failed: {0}")]
    SendFailed(String),
}

/// Link state reported by the transport for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// The profile-level connection is being established.
    Connecting,
    /// The host accepted the connection; reports can flow.
    Connected,
    /// The link closed.
    Disconnected,
}

/// The single ordered event stream consumed by the engine.
///
/// Transport and Device Registry notifications are merged into one channel
/// so the engine observes a total order across both capabilities.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The platform confirmed the HID keyboard profile is registered.
    Registered,
    /// The link state for a device changed.
    ConnectionState { device: Device, state: LinkState },
    /// The transport is unusable; surfaced to users as an error status.
    TransportUnavailable { reason: String },
    /// The OS completed bonding with a device (Device Registry event).
    DeviceBonded(Device),
}

/// SDP/descriptor metadata the transport registers the keyboard under.
///
/// The boot protocol needs no report descriptor; this carries only the
/// human-visible identity a host shows in its device list.
#[derive(Debug, Clone)]
pub struct KeyboardDescriptor {
    /// Device name shown to the host.
    pub name: String,
    /// Free-form service description.
    pub description: String,
}

impl Default for KeyboardDescriptor {
    fn default() -> Self {
        Self {
            name: "hidkb keyboard".to_string(),
            description: "HID boot-protocol keyboard emulator".to_string(),
        }
    }
}

/// Platform-agnostic HID transport.
///
/// All methods return quickly; long-running outcomes (registration
/// completing, a host accepting a connection) arrive as [`EngineEvent`]s.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Registers this process as a HID boot-protocol keyboard.
    ///
    /// Completion is signalled by [`EngineEvent::Registered`].
    async fn register_keyboard(&self, descriptor: &KeyboardDescriptor)
        -> Result<(), TransportError>;

    /// Sends one 8-byte input report to the connected host.
    async fn send_report(
        &self,
        device: &Device,
        report: &InputReport,
    ) -> Result<(), TransportError>;

    /// Starts a profile connection attempt to `device`.
    ///
    /// The outcome arrives as [`EngineEvent::ConnectionState`] events.
    async fn connect(&self, device: &Device) -> Result<(), TransportError>;

    /// Makes this device discoverable to new hosts.
    async fn make_discoverable(&self) -> Result<(), TransportError>;
}
