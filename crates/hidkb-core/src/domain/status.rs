//! Externally visible connection status enumeration.

use serde::{Deserialize, Serialize};

/// The full set of connection states the engine can report.
///
/// Exactly one value is current at any time.  It is owned by the engine's
/// connection state machine, mutated only by transport events or explicit
/// connect/disconnect requests, and read by any observer.  The `Display`
/// impl produces the exact status strings shown to users; no other states
/// are observable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Engine constructed, registration not yet requested.
    Initializing,
    /// HID profile registration submitted to the transport.
    Registering,
    /// Registered; waiting for a host to connect or a connect request.
    WaitingForHost,
    /// A connection attempt is in flight.
    Connecting,
    /// A bonding event completed for a requested address; a short settle
    /// delay runs before the actual connect call is issued.
    DeviceBondedConnecting,
    /// Connected; typing is permitted only in this state.
    PairedReady,
    /// The transport reported the link is going down.
    Disconnecting,
    /// No active connection.
    Disconnected,
    /// Fatal-to-this-attempt failure; recoverable by user retry.
    Error(String),
}

impl ConnectionStatus {
    /// Returns `true` if typing may start in this state.
    pub fn typing_permitted(&self) -> bool {
        matches!(self, ConnectionStatus::PairedReady)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Initializing => write!(f, "Initializing"),
            ConnectionStatus::Registering => write!(f, "Registering"),
            ConnectionStatus::WaitingForHost => write!(f, "WaitingForHost"),
            ConnectionStatus::Connecting => write!(f, "Connecting"),
            ConnectionStatus::DeviceBondedConnecting => write!(f, "DeviceBondedConnecting"),
            ConnectionStatus::PairedReady => write!(f, "PairedReady"),
            ConnectionStatus::Disconnecting => write!(f, "Disconnecting"),
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Error(reason) => write!(f, "Error: {reason}"),
        }
    }
}
