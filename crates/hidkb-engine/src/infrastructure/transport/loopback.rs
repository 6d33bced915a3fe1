//! In-process loopback transport.
//!
//! Plays the part of a host without any radio: registration is acknowledged
//! immediately, connect requests succeed after emitting the intermediate
//! `Connecting` state, and every report is recorded (and traced) instead of
//! being transmitted.
//!
//! This is a first-class adapter, not test scaffolding: the `hidkb` binary
//! runs against it so the whole engine can be driven end-to-end on a machine
//! with no Bluetooth stack, and the integration tests use the same code path
//! the binary does.  Failure injection (`set_fail_sends`, `drop_link`) exists
//! so link-loss behaviour is reachable from tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use hidkb_core::{Device, InputReport};

use super::{EngineEvent, KeyboardDescriptor, LinkState, Transport, TransportError};

/// A simulated host on the other end of the HID link.
pub struct LoopbackTransport {
    events: mpsc::Sender<EngineEvent>,
    /// Every report accepted, in send order, with the destination address.
    reports: Mutex<Vec<(String, InputReport)>>,
    registered: AtomicBool,
    connect_attempts: AtomicUsize,
    /// When set, `send_report` fails and the link is reported down,
    /// simulating a host that vanished mid-session.
    fail_sends: AtomicBool,
}

impl LoopbackTransport {
    /// Creates a loopback transport that emits events into `events`.
    pub fn new(events: mpsc::Sender<EngineEvent>) -> Self {
        Self {
            events,
            reports: Mutex::new(Vec::new()),
            registered: AtomicBool::new(false),
            connect_attempts: AtomicUsize::new(0),
            fail_sends: AtomicBool::new(false),
        }
    }

    /// Snapshot of all accepted reports in send order.
    pub fn sent_reports(&self) -> Vec<InputReport> {
        self.reports
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(|(_, report)| *report)
            .collect()
    }

    /// Number of reports accepted so far.
    pub fn report_count(&self) -> usize {
        self.reports.lock().expect("lock poisoned").len()
    }

    /// Number of connection attempts received, accepted or not.
    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    /// Arms or disarms send-failure injection.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Simulates the host closing the link on its own.
    pub fn drop_link(&self, device: &Device) {
        let _ = self.events.try_send(EngineEvent::ConnectionState {
            device: device.clone(),
            state: LinkState::Disconnected,
        });
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn register_keyboard(
        &self,
        descriptor: &KeyboardDescriptor,
    ) -> Result<(), TransportError> {
        info!(name = %descriptor.name, "loopback: registering HID keyboard");
        self.registered.store(true, Ordering::SeqCst);
        self.events
            .send(EngineEvent::Registered)
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))
    }

    async fn send_report(
        &self,
        device: &Device,
        report: &InputReport,
    ) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            debug!(device = %device.address, "loopback: injected send failure");
            let _ = self
                .events
                .send(EngineEvent::ConnectionState {
                    device: device.clone(),
                    state: LinkState::Disconnected,
                })
                .await;
            return Err(TransportError::SendFailed("link lost".to_string()));
        }

        trace!(
            device = %device.address,
            modifier = report.modifier(),
            usage = report.first_key(),
            "loopback: report"
        );
        self.reports
            .lock()
            .expect("lock poisoned")
            .push((device.address.clone(), *report));
        Ok(())
    }

    async fn connect(&self, device: &Device) -> Result<(), TransportError> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if !self.registered.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectFailed {
                address: device.address.clone(),
                reason: "keyboard profile not registered".to_string(),
            });
        }
        info!(device = %device, "loopback: host accepting connection");
        for state in [LinkState::Connecting, LinkState::Connected] {
            self.events
                .send(EngineEvent::ConnectionState {
                    device: device.clone(),
                    state,
                })
                .await
                .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        }
        Ok(())
    }

    async fn make_discoverable(&self) -> Result<(), TransportError> {
        info!("loopback: discoverable (no-op)");
        Ok(())
    }
}
