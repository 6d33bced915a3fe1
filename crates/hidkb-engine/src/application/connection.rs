//! Connection state machine.
//!
//! Tracks registration, bonding, and connection progress from transport
//! events and user-initiated connect requests, and derives the externally
//! visible [`ConnectionStatus`].
//!
//! # Connection lifecycle (for beginners)
//!
//! ```text
//! Initializing ──► Registering ──► WaitingForHost ──► Connecting ──► PairedReady
//!                                        │                 ▲              │
//!                                        ▼                 │              ▼
//!                               DeviceBondedConnecting ────┘        Disconnecting
//!                                                                        │
//!                        Error ◄── (transport unavailable,               ▼
//!                          │        registration failure)          Disconnected
//!                          └──────────► Connecting ◄────────────────────┘
//!                                    (user retry)
//! ```
//!
//! The machine is a plain synchronous struct with no I/O: callers feed it
//! events and act on the returned [`ConnectDirective`].  That keeps the
//! transition table exhaustive and testable without any platform dependency.
//! The engine wraps one instance in a `tokio::sync::Mutex`, which is the
//! data-race-free exchange point between the event pump and the typing
//! worker reading the active device.
//!
//! # Deferred connects
//!
//! Two situations require a connect call to happen *later*:
//!
//! - A connect requested before registration completes is queued as a
//!   `pending_connect` intent and issued when `Registered` arrives.
//! - A bonding event for a previously requested address moves the machine to
//!   `DeviceBondedConnecting`; the connect call must wait a short settle
//!   delay because a connection attempt immediately after bonding is
//!   unreliable on real stacks.
//!
//! Both are modeled as explicit directives returned to the caller — the
//! machine never holds callbacks.

use tracing::{debug, warn};

use hidkb_core::{ConnectionStatus, Device};

/// What the caller must do after feeding the machine an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectDirective {
    /// Nothing to do.
    None,
    /// Issue `Transport::connect` for this device now.
    ConnectNow(Device),
    /// Issue `Transport::connect` after the bond settle delay.
    ConnectAfterSettle(Device),
}

/// The connection state machine.  One instance per engine.
#[derive(Debug)]
pub struct ConnectionStateMachine {
    status: ConnectionStatus,
    active_device: Option<Device>,
    /// Connect intent queued until registration (or bonding) completes.
    pending_connect: Option<Device>,
}

impl ConnectionStateMachine {
    /// Creates a machine in `Initializing` with no device and no intent.
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Initializing,
            active_device: None,
            pending_connect: None,
        }
    }

    /// Current externally visible status.
    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// The device reports are currently routed to, if any.
    pub fn active_device(&self) -> Option<&Device> {
        self.active_device.as_ref()
    }

    /// A registration request was submitted to the transport.
    ///
    /// Legal from `Initializing` and, for user retry after a failure, from
    /// `Error` and `Disconnected`.  Elsewhere it is ignored.
    pub fn request_registration(&mut self) {
        match self.status {
            ConnectionStatus::Initializing
            | ConnectionStatus::Error(_)
            | ConnectionStatus::Disconnected => {
                self.status = ConnectionStatus::Registering;
            }
            _ => debug!(status = %self.status, "registration request ignored"),
        }
    }

    /// The platform confirmed the HID profile is registered.
    ///
    /// Returns [`ConnectDirective::ConnectNow`] if a connect intent was
    /// queued while registration was in flight.
    pub fn registration_confirmed(&mut self) -> ConnectDirective {
        if self.status != ConnectionStatus::Registering {
            debug!(status = %self.status, "spurious registration confirmation");
            return ConnectDirective::None;
        }
        match self.pending_connect.take() {
            Some(device) => {
                self.status = ConnectionStatus::Connecting;
                ConnectDirective::ConnectNow(device)
            }
            None => {
                self.status = ConnectionStatus::WaitingForHost;
                ConnectDirective::None
            }
        }
    }

    /// A user asked to connect to `device`.
    ///
    /// From `WaitingForHost`, `Disconnected`, or `Error` the request is
    /// issued immediately; before registration completes it is queued as a
    /// pending intent instead.
    pub fn request_connect(&mut self, device: Device) -> ConnectDirective {
        match self.status {
            ConnectionStatus::WaitingForHost
            | ConnectionStatus::Disconnected
            | ConnectionStatus::Error(_) => {
                self.status = ConnectionStatus::Connecting;
                ConnectDirective::ConnectNow(device)
            }
            ConnectionStatus::Initializing | ConnectionStatus::Registering => {
                self.pending_connect = Some(device);
                ConnectDirective::None
            }
            _ => {
                debug!(status = %self.status, "connect request ignored");
                ConnectDirective::None
            }
        }
    }

    /// The OS completed bonding with `device`.
    ///
    /// Only meaningful when a connect intent for this address is pending:
    /// the machine moves to `DeviceBondedConnecting` and the caller must
    /// issue the connect after the settle delay.
    pub fn device_bonded(&mut self, device: Device) -> ConnectDirective {
        let matches_pending = self
            .pending_connect
            .as_ref()
            .is_some_and(|p| p.address == device.address);
        if !matches_pending {
            return ConnectDirective::None;
        }
        self.pending_connect = None;
        self.status = ConnectionStatus::DeviceBondedConnecting;
        ConnectDirective::ConnectAfterSettle(device)
    }

    /// The transport reported a profile-level connection attempt in flight
    /// (for example a host connecting on its own initiative).
    pub fn link_connecting(&mut self) {
        if matches!(
            self.status,
            ConnectionStatus::WaitingForHost | ConnectionStatus::Disconnected
        ) {
            self.status = ConnectionStatus::Connecting;
        }
    }

    /// The transport reported a live connection to `device`.
    pub fn link_connected(&mut self, device: Device) {
        match self.status {
            ConnectionStatus::Connecting
            | ConnectionStatus::DeviceBondedConnecting
            | ConnectionStatus::WaitingForHost => {
                self.status = ConnectionStatus::PairedReady;
                self.active_device = Some(device);
            }
            _ => debug!(status = %self.status, "connected event ignored"),
        }
    }

    /// The transport reported the link is going down.
    pub fn link_closing(&mut self) {
        if self.status == ConnectionStatus::PairedReady {
            self.status = ConnectionStatus::Disconnecting;
        }
    }

    /// The link is fully down; the active device reference is cleared.
    pub fn link_closed(&mut self) {
        self.active_device = None;
        self.status = ConnectionStatus::Disconnected;
    }

    /// The transport signalled unavailability or registration failed.
    /// Reachable from any state; recoverable by user retry.
    pub fn fail(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(%reason, "transport failure");
        self.active_device = None;
        self.pending_connect = None;
        self.status = ConnectionStatus::Error(reason);
    }
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Device {
        Device::bonded("AA:BB:CC:DD:EE:FF", "host")
    }

    /// Drives a fresh machine to `WaitingForHost`.
    fn registered_machine() -> ConnectionStateMachine {
        let mut sm = ConnectionStateMachine::new();
        sm.request_registration();
        assert_eq!(sm.registration_confirmed(), ConnectDirective::None);
        sm
    }

    /// Drives a fresh machine all the way to `PairedReady`.
    fn connected_machine() -> ConnectionStateMachine {
        let mut sm = registered_machine();
        assert_eq!(
            sm.request_connect(host()),
            ConnectDirective::ConnectNow(host())
        );
        sm.link_connected(host());
        sm
    }

    // ── Happy path ────────────────────────────────────────────────────────────

    #[test]
    fn test_starts_in_initializing() {
        let sm = ConnectionStateMachine::new();
        assert_eq!(*sm.status(), ConnectionStatus::Initializing);
        assert!(sm.active_device().is_none());
    }

    #[test]
    fn test_registration_request_moves_to_registering() {
        let mut sm = ConnectionStateMachine::new();
        sm.request_registration();
        assert_eq!(*sm.status(), ConnectionStatus::Registering);
    }

    #[test]
    fn test_registration_confirmation_moves_to_waiting_for_host() {
        let sm = registered_machine();
        assert_eq!(*sm.status(), ConnectionStatus::WaitingForHost);
    }

    #[test]
    fn test_connect_request_from_waiting_issues_immediately() {
        let mut sm = registered_machine();
        let directive = sm.request_connect(host());
        assert_eq!(directive, ConnectDirective::ConnectNow(host()));
        assert_eq!(*sm.status(), ConnectionStatus::Connecting);
    }

    #[test]
    fn test_connected_event_sets_paired_ready_and_active_device() {
        let sm = connected_machine();
        assert_eq!(*sm.status(), ConnectionStatus::PairedReady);
        assert_eq!(sm.active_device(), Some(&host()));
        assert!(sm.status().typing_permitted());
    }

    #[test]
    fn test_disconnection_passes_through_disconnecting_and_clears_device() {
        let mut sm = connected_machine();

        sm.link_closing();
        assert_eq!(*sm.status(), ConnectionStatus::Disconnecting);

        sm.link_closed();
        assert_eq!(*sm.status(), ConnectionStatus::Disconnected);
        assert!(sm.active_device().is_none());
    }

    // ── Deferred connects ─────────────────────────────────────────────────────

    #[test]
    fn test_connect_before_registration_is_queued_then_issued_on_confirmation() {
        let mut sm = ConnectionStateMachine::new();
        sm.request_registration();

        // Queued while Registering: no directive, status unchanged.
        assert_eq!(sm.request_connect(host()), ConnectDirective::None);
        assert_eq!(*sm.status(), ConnectionStatus::Registering);

        // Issued exactly once when registration completes.
        assert_eq!(
            sm.registration_confirmed(),
            ConnectDirective::ConnectNow(host())
        );
        assert_eq!(*sm.status(), ConnectionStatus::Connecting);
    }

    #[test]
    fn test_bonding_event_for_pending_address_defers_connect_behind_settle() {
        let mut sm = ConnectionStateMachine::new();
        sm.request_registration();
        sm.request_connect(host());

        let directive = sm.device_bonded(host());

        assert_eq!(directive, ConnectDirective::ConnectAfterSettle(host()));
        assert_eq!(*sm.status(), ConnectionStatus::DeviceBondedConnecting);

        // The intent is consumed: a second bonding event does nothing.
        assert_eq!(sm.device_bonded(host()), ConnectDirective::None);
    }

    #[test]
    fn test_bonding_event_without_pending_intent_is_ignored() {
        let mut sm = registered_machine();
        assert_eq!(sm.device_bonded(host()), ConnectDirective::None);
        assert_eq!(*sm.status(), ConnectionStatus::WaitingForHost);
    }

    #[test]
    fn test_bonding_event_for_different_address_leaves_intent_queued() {
        let mut sm = ConnectionStateMachine::new();
        sm.request_registration();
        sm.request_connect(host());

        let other = Device::bonded("11:22:33:44:55:66", "other");
        assert_eq!(sm.device_bonded(other), ConnectDirective::None);

        // The original intent still fires on registration confirmation.
        assert_eq!(
            sm.registration_confirmed(),
            ConnectDirective::ConnectNow(host())
        );
    }

    #[test]
    fn test_connected_after_settle_completes_the_bonded_path() {
        let mut sm = ConnectionStateMachine::new();
        sm.request_registration();
        sm.request_connect(host());
        sm.device_bonded(host());

        sm.link_connected(host());

        assert_eq!(*sm.status(), ConnectionStatus::PairedReady);
        assert_eq!(sm.active_device(), Some(&host()));
    }

    // ── Failure and retry ─────────────────────────────────────────────────────

    #[test]
    fn test_transport_failure_reaches_error_from_any_state() {
        let states: [fn() -> ConnectionStateMachine; 3] = [
            ConnectionStateMachine::new,
            registered_machine,
            connected_machine,
        ];
        for make in states {
            let mut sm = make();
            sm.fail("bluetooth radio disabled");
            assert_eq!(
                *sm.status(),
                ConnectionStatus::Error("bluetooth radio disabled".to_string())
            );
            assert!(sm.active_device().is_none());
        }
    }

    #[test]
    fn test_error_state_allows_connect_retry() {
        let mut sm = connected_machine();
        sm.fail("link dropped");

        let directive = sm.request_connect(host());

        assert_eq!(directive, ConnectDirective::ConnectNow(host()));
        assert_eq!(*sm.status(), ConnectionStatus::Connecting);
    }

    #[test]
    fn test_disconnected_state_allows_connect_retry() {
        let mut sm = connected_machine();
        sm.link_closing();
        sm.link_closed();

        assert_eq!(
            sm.request_connect(host()),
            ConnectDirective::ConnectNow(host())
        );
        assert_eq!(*sm.status(), ConnectionStatus::Connecting);
    }

    #[test]
    fn test_error_state_allows_re_initialization() {
        let mut sm = connected_machine();
        sm.fail("radio off");
        sm.request_registration();
        assert_eq!(*sm.status(), ConnectionStatus::Registering);
    }

    // ── Illegal events leave the state unchanged ──────────────────────────────

    #[test]
    fn test_spurious_registration_confirmation_is_ignored() {
        let mut sm = connected_machine();
        assert_eq!(sm.registration_confirmed(), ConnectDirective::None);
        assert_eq!(*sm.status(), ConnectionStatus::PairedReady);
    }

    #[test]
    fn test_connect_request_while_paired_ready_is_ignored() {
        let mut sm = connected_machine();
        assert_eq!(sm.request_connect(host()), ConnectDirective::None);
        assert_eq!(*sm.status(), ConnectionStatus::PairedReady);
    }

    #[test]
    fn test_connected_event_while_initializing_is_ignored() {
        let mut sm = ConnectionStateMachine::new();
        sm.link_connected(host());
        assert_eq!(*sm.status(), ConnectionStatus::Initializing);
        assert!(sm.active_device().is_none());
    }

    #[test]
    fn test_link_closing_outside_paired_ready_is_ignored() {
        let mut sm = registered_machine();
        sm.link_closing();
        assert_eq!(*sm.status(), ConnectionStatus::WaitingForHost);
    }

    #[test]
    fn test_host_initiated_connection_from_waiting_is_accepted() {
        let mut sm = registered_machine();
        sm.link_connecting();
        assert_eq!(*sm.status(), ConnectionStatus::Connecting);
        sm.link_connected(host());
        assert_eq!(*sm.status(), ConnectionStatus::PairedReady);
    }
}
