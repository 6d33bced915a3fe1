//! The keyboard engine: composition root and operation surface.
//!
//! One [`KeyboardEngine`] owns the connection state machine, the single
//! optional typing session, and the event pump that feeds transport and
//! registry notifications into both.  All operations return quickly;
//! long-running outcomes surface on the status observer channel.
//!
//! # Concurrency layout
//!
//! - The **event pump** is one background task draining the single ordered
//!   [`EngineEvent`] channel.  It is the only writer of connection state.
//! - The **typing worker** (at most one, see [`super::typing`]) reads the
//!   state machine behind a `tokio::sync::Mutex` and writes only the status
//!   cell and the `session_active` flag.
//! - **Callers** invoke operations from any task; each operation takes the
//!   state-machine lock for the duration of one transition at most.
//!
//! Status is a push stream: every externally visible change is written to
//! the [`StatusCell`], which keeps the latest value for polling and forwards
//! each change to the observer channel handed out by [`KeyboardEngine::new`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use hidkb_core::{ConnectionStatus, Device, KeyMap, TimingConfig, TimingConfigError};

use crate::application::connection::{ConnectDirective, ConnectionStateMachine};
use crate::application::typing::{spawn_session, SessionParams, TypingSession};
use crate::infrastructure::registry::DeviceRegistry;
use crate::infrastructure::transport::{
    EngineEvent, KeyboardDescriptor, LinkState, Transport,
};

/// Error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The transport rejected the HID profile registration.
    #[error("keyboard registration failed: {0}")]
    RegistrationFailed(String),

    /// The transport as a whole is unusable.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// A connection attempt could not be started.
    #[error("connect to {address} failed: {reason}")]
    ConnectFailed { address: String, reason: String },

    /// Typing was requested without a live connection.
    #[error("no active connection; connect to a host first")]
    NoActiveConnection,

    /// A second typing session was requested while one is running.
    #[error("a typing session is already in progress")]
    SessionAlreadyActive,

    /// The requested address is not in the bonded-device list.
    #[error("device {0} is not bonded; pair it with the host OS first")]
    DeviceNotBonded(String),

    /// The requested typing cadence is out of range.
    #[error(transparent)]
    InvalidDelay(#[from] TimingConfigError),
}

/// What an observer sees: either a connection state or an active session.
///
/// `Typing` shadows `PairedReady` while a session runs; when the session
/// ends the status is restored from the live connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    /// Mirror of the connection state machine.
    Connection(ConnectionStatus),
    /// A typing session is in progress.
    Typing,
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineStatus::Connection(status) => write!(f, "{status}"),
            EngineStatus::Typing => write!(f, "Typing..."),
        }
    }
}

/// Latest status plus the push channel to observers.
///
/// `set` never blocks: if the observer is not draining its channel the
/// update is dropped there, but `get` always reflects the newest value.
pub(crate) struct StatusCell {
    current: std::sync::Mutex<EngineStatus>,
    observer: mpsc::Sender<EngineStatus>,
}

impl StatusCell {
    fn new(observer: mpsc::Sender<EngineStatus>) -> Self {
        Self {
            current: std::sync::Mutex::new(EngineStatus::Connection(
                ConnectionStatus::Initializing,
            )),
            observer,
        }
    }

    pub(crate) fn set(&self, status: EngineStatus) {
        {
            let mut current = self.current.lock().expect("lock poisoned");
            if *current == status {
                return;
            }
            *current = status.clone();
        }
        if self.observer.try_send(status).is_err() {
            debug!("status observer not draining; update dropped");
        }
    }

    pub(crate) fn get(&self) -> EngineStatus {
        self.current.lock().expect("lock poisoned").clone()
    }
}

/// Builds a status cell wired to a fresh observer channel.
#[cfg(test)]
pub(crate) fn status_cell_for_tests() -> (Arc<StatusCell>, mpsc::Receiver<EngineStatus>) {
    let (tx, rx) = mpsc::channel(64);
    (Arc::new(StatusCell::new(tx)), rx)
}

/// The composition root: owns state, sessions, and the event pump.
pub struct KeyboardEngine {
    transport: Arc<dyn Transport>,
    registry: Arc<dyn DeviceRegistry>,
    state_machine: Arc<Mutex<ConnectionStateMachine>>,
    /// Handle to the current session; replaced on each start, never awaited
    /// by operations.
    session: std::sync::Mutex<Option<TypingSession>>,
    /// Gate for the one-session-at-a-time rule; cleared by the worker.
    session_active: Arc<AtomicBool>,
    status: Arc<StatusCell>,
    descriptor: KeyboardDescriptor,
    /// Wait after a bonding event before the connect call is issued; an
    /// immediate attempt is unreliable on real stacks.
    settle_delay: Duration,
}

impl KeyboardEngine {
    /// Creates the engine and spawns its event pump.
    ///
    /// `events` is the single ordered channel all transport and registry
    /// adapters were constructed with.  The returned receiver delivers
    /// every externally visible status change in order.
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<dyn DeviceRegistry>,
        events: mpsc::Receiver<EngineEvent>,
        descriptor: KeyboardDescriptor,
        settle_delay: Duration,
    ) -> (Arc<Self>, mpsc::Receiver<EngineStatus>) {
        let (status_tx, status_rx) = mpsc::channel(64);
        let engine = Arc::new(Self {
            transport,
            registry,
            state_machine: Arc::new(Mutex::new(ConnectionStateMachine::new())),
            session: std::sync::Mutex::new(None),
            session_active: Arc::new(AtomicBool::new(false)),
            status: Arc::new(StatusCell::new(status_tx)),
            descriptor,
            settle_delay,
        });
        tokio::spawn(Arc::clone(&engine).pump(events));
        (engine, status_rx)
    }

    // ── Operations ────────────────────────────────────────────────────────────

    /// Registers this process as a HID boot-protocol keyboard.
    ///
    /// Returns the current status string as soon as the request is
    /// submitted; the transition to `WaitingForHost` arrives via the status
    /// channel once the platform confirms registration.
    pub async fn initialize(&self) -> Result<String, EngineError> {
        {
            let mut sm = self.state_machine.lock().await;
            sm.request_registration();
            self.status.set(EngineStatus::Connection(sm.status().clone()));
        }
        if let Err(e) = self.transport.register_keyboard(&self.descriptor).await {
            let reason = e.to_string();
            self.fail(reason.clone()).await;
            return Err(EngineError::RegistrationFailed(reason));
        }
        info!(name = %self.descriptor.name, "keyboard registration submitted");
        Ok(self.status.get().to_string())
    }

    /// Snapshot of the platform's bonded-device list.
    pub fn get_paired_devices(&self) -> Vec<Device> {
        self.registry.list_bonded_devices()
    }

    /// Requests a connection to the bonded device at `address` and returns
    /// the current status string; the outcome arrives as status events.
    ///
    /// An address the registry does not list as bonded is rejected here
    /// without touching the transport.  Before registration completes the
    /// request is queued and issued automatically once `Registered` arrives.
    pub async fn connect_to_device(&self, address: &str) -> Result<String, EngineError> {
        let device = self
            .registry
            .find_bonded(address)
            .ok_or_else(|| EngineError::DeviceNotBonded(address.to_string()))?;

        let directive = {
            let mut sm = self.state_machine.lock().await;
            let directive = sm.request_connect(device);
            self.status.set(EngineStatus::Connection(sm.status().clone()));
            directive
        };
        match directive {
            ConnectDirective::ConnectNow(device) => self.issue_connect(device).await?,
            ConnectDirective::ConnectAfterSettle(device) => self.connect_after_settle(device),
            ConnectDirective::None => {
                debug!(address, "connect request queued until registration completes");
            }
        }
        Ok(self.status.get().to_string())
    }

    /// Makes this device discoverable so a new host can find and bond it.
    /// The connection status is unaffected and returned as-is.
    pub async fn make_discoverable(&self) -> Result<String, EngineError> {
        self.transport
            .make_discoverable()
            .await
            .map_err(|e| EngineError::TransportUnavailable(e.to_string()))?;
        Ok(self.status.get().to_string())
    }

    /// Starts a typing session for `text` with the given cadence.
    ///
    /// Rejections, in order: an out-of-range delay, no live connection, a
    /// session already in progress.  Characters without a key mapping are
    /// logged once here and skipped (timing preserved) by the worker.
    pub async fn start_typing(
        &self,
        text: &str,
        delay_ms: u64,
        letter_jitter: bool,
        word_pause: bool,
    ) -> Result<String, EngineError> {
        let timing = TimingConfig::new(delay_ms, letter_jitter, word_pause)?;

        let device = {
            let sm = self.state_machine.lock().await;
            if !sm.status().typing_permitted() {
                return Err(EngineError::NoActiveConnection);
            }
            match sm.active_device() {
                Some(device) => device.clone(),
                None => return Err(EngineError::NoActiveConnection),
            }
        };

        if self
            .session_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EngineError::SessionAlreadyActive);
        }

        let unsupported = KeyMap::unsupported_chars(text);
        if !unsupported.is_empty() {
            warn!(?unsupported, "characters without a key mapping will be skipped");
        }

        self.status.set(EngineStatus::Typing);
        let session = spawn_session(SessionParams {
            text: text.to_string(),
            timing,
            device,
            transport: Arc::clone(&self.transport),
            state_machine: Arc::clone(&self.state_machine),
            status: Arc::clone(&self.status),
            session_active: Arc::clone(&self.session_active),
        });
        debug!(session = %session.id(), "typing session spawned");
        *self.session.lock().expect("lock poisoned") = Some(session);
        Ok(self.status.get().to_string())
    }

    /// Requests cancellation of the active typing session, if any, and
    /// returns the current status string.
    ///
    /// Idempotent and non-blocking: at most one in-flight keystroke delay
    /// elapses before the worker stops.  Never drops the connection.
    pub fn stop_typing(&self) -> Result<String, EngineError> {
        let session = self.session.lock().expect("lock poisoned");
        if let Some(session) = session.as_ref() {
            if self.session_active.load(Ordering::SeqCst) {
                session.request_stop();
            }
        }
        Ok(self.status.get().to_string())
    }

    /// Latest externally visible status (also pushed to the observer channel).
    pub fn get_status(&self) -> EngineStatus {
        self.status.get()
    }

    // ── Event pump ────────────────────────────────────────────────────────────

    /// Drains the engine event channel until all senders are dropped.
    async fn pump(self: Arc<Self>, mut events: mpsc::Receiver<EngineEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        debug!("engine event channel closed; pump exiting");
    }

    async fn handle_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::Registered => {
                let directive = {
                    let mut sm = self.state_machine.lock().await;
                    let directive = sm.registration_confirmed();
                    self.status.set(EngineStatus::Connection(sm.status().clone()));
                    directive
                };
                if let ConnectDirective::ConnectNow(device) = directive {
                    if let Err(e) = self.issue_connect(device).await {
                        error!(error = %e, "queued connect failed");
                    }
                }
            }

            EngineEvent::ConnectionState { device, state } => {
                let mut sm = self.state_machine.lock().await;
                match state {
                    LinkState::Connecting => sm.link_connecting(),
                    LinkState::Connected => {
                        info!(device = %device, "link established");
                        sm.link_connected(device);
                    }
                    LinkState::Disconnected => {
                        info!(device = %device, "link closed");
                        sm.link_closing();
                        self.status.set(EngineStatus::Connection(sm.status().clone()));
                        sm.link_closed();
                    }
                }
                self.status.set(EngineStatus::Connection(sm.status().clone()));
            }

            EngineEvent::TransportUnavailable { reason } => {
                self.fail(reason).await;
            }

            EngineEvent::DeviceBonded(device) => {
                let directive = {
                    let mut sm = self.state_machine.lock().await;
                    let directive = sm.device_bonded(device);
                    self.status.set(EngineStatus::Connection(sm.status().clone()));
                    directive
                };
                if let ConnectDirective::ConnectAfterSettle(device) = directive {
                    self.connect_after_settle(device);
                }
            }
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    /// Issues the transport connect call; a failure moves the machine to
    /// `Error` and is also returned to the caller.
    async fn issue_connect(&self, device: Device) -> Result<(), EngineError> {
        if let Err(e) = self.transport.connect(&device).await {
            let reason = e.to_string();
            self.fail(reason.clone()).await;
            return Err(EngineError::ConnectFailed {
                address: device.address,
                reason,
            });
        }
        Ok(())
    }

    /// Schedules a connect attempt after the bond settle delay.
    fn connect_after_settle(&self, device: Device) {
        info!(device = %device, delay = ?self.settle_delay, "bonded; connecting after settle delay");
        let transport = Arc::clone(&self.transport);
        let state_machine = Arc::clone(&self.state_machine);
        let status = Arc::clone(&self.status);
        let settle_delay = self.settle_delay;
        tokio::spawn(async move {
            tokio::time::sleep(settle_delay).await;
            if let Err(e) = transport.connect(&device).await {
                let mut sm = state_machine.lock().await;
                sm.fail(e.to_string());
                status.set(EngineStatus::Connection(sm.status().clone()));
            }
        });
    }

    /// Moves the machine to `Error` and publishes the new status.
    async fn fail(&self, reason: String) {
        let mut sm = self.state_machine.lock().await;
        sm.fail(reason);
        self.status.set(EngineStatus::Connection(sm.status().clone()));
    }
}
