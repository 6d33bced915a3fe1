//! Typing sessions: the cancellable, timed transmission loop.
//!
//! A session owns one block of text and replays it as key-down/key-up report
//! pairs on a dedicated Tokio task, so callers never block.  Cancellation is
//! cooperative: `request_stop` flips a flag and returns immediately, the
//! worker observes it at the next character boundary, and a send is never
//! interrupted between building and transmitting a report.
//!
//! # Timing model
//!
//! Each supported character costs two phases of `effective_delay`: one while
//! the key is held, one after release.  `effective_delay` is the session's
//! base delay plus, with letter jitter enabled, a uniformly random 5–50 ms.
//! A space with word pause enabled adds one extra uniformly random 5–400 ms
//! after its release.  Unsupported characters send nothing but still consume
//! the base delay, so the overall typing rate is preserved.
//!
//! # Exit behaviour
//!
//! Whether the loop ends by completion, cancellation, or a transport error,
//! the worker restores the externally visible status from the live
//! connection state machine — `PairedReady` if still connected,
//! `Disconnected` otherwise.  Finishing a session never alters connection
//! state itself.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use hidkb_core::domain::timing::{
    JITTER_MAX_MS, JITTER_MIN_MS, WORD_PAUSE_MAX_MS, WORD_PAUSE_MIN_MS,
};
use hidkb_core::{Device, InputReport, KeyMap, TimingConfig};

use crate::application::connection::ConnectionStateMachine;
use crate::application::engine::{EngineStatus, StatusCell};
use crate::infrastructure::transport::Transport;

/// Handle to a running typing session.
///
/// At most one exists per engine at any time.  Dropping the handle does not
/// stop the worker; call [`TypingSession::request_stop`] for that.
pub struct TypingSession {
    id: Uuid,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl TypingSession {
    /// Unique identifier of this session, used in log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Sets the cancellation flag and returns immediately.
    ///
    /// Does not wait for the worker: at most one character's worth of
    /// in-flight delay elapses before the flag is observed.  Never forces a
    /// disconnect.
    pub fn request_stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once the worker has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the worker to exit.  Used by tests and shutdown paths.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

/// Everything the worker needs, moved onto its task.
pub(crate) struct SessionParams {
    pub text: String,
    pub timing: TimingConfig,
    pub device: Device,
    pub transport: Arc<dyn Transport>,
    pub state_machine: Arc<Mutex<ConnectionStateMachine>>,
    pub status: Arc<StatusCell>,
    /// Cleared by the worker on exit so the engine can accept a new session.
    pub session_active: Arc<AtomicBool>,
}

/// Spawns the background worker and returns its handle.
pub(crate) fn spawn_session(params: SessionParams) -> TypingSession {
    let id = Uuid::new_v4();
    let cancel = Arc::new(AtomicBool::new(false));
    let worker = Worker {
        id,
        cancel: Arc::clone(&cancel),
        sampler: UniformSampler::new(),
        params,
    };
    let handle = tokio::spawn(worker.run());
    TypingSession { id, cancel, handle }
}

struct Worker {
    id: Uuid,
    cancel: Arc<AtomicBool>,
    sampler: UniformSampler,
    params: SessionParams,
}

/// Why the loop stopped; logged, never surfaced as state.
#[derive(Debug, PartialEq, Eq)]
enum LoopExit {
    Completed,
    Cancelled,
    TransportError,
}

impl Worker {
    async fn run(mut self) {
        info!(
            session = %self.id,
            device = %self.params.device,
            chars = self.params.text.chars().count(),
            delay_ms = self.params.timing.base_delay_ms,
            "typing session started"
        );

        let exit = self.type_text().await;

        // Restore the visible status from the live connection state; typing
        // completion or cancellation must never itself alter connection state.
        let restored = {
            let sm = self.params.state_machine.lock().await;
            sm.status().clone()
        };
        self.params
            .status
            .set(EngineStatus::Connection(restored));
        self.params.session_active.store(false, Ordering::SeqCst);

        info!(session = %self.id, ?exit, "typing session ended");
    }

    async fn type_text(&mut self) -> LoopExit {
        let base = Duration::from_millis(self.params.timing.base_delay_ms);
        // Borrow dance: the loop mutates self (sampler) while iterating text.
        let text = std::mem::take(&mut self.params.text);

        for ch in text.chars() {
            if self.cancel.load(Ordering::SeqCst) {
                debug!(session = %self.id, "cancellation observed");
                return LoopExit::Cancelled;
            }

            let Some(mapping) = KeyMap::lookup(ch) else {
                // Unsupported: consume the scheduled delay, emit nothing.
                tokio::time::sleep(base).await;
                continue;
            };

            let down = InputReport::key_down(mapping.usage, mapping.modifier);
            if !self.send(&down).await {
                return LoopExit::TransportError;
            }
            tokio::time::sleep(self.effective_delay()).await;

            if !self.send(&InputReport::key_up()).await {
                return LoopExit::TransportError;
            }
            tokio::time::sleep(self.effective_delay()).await;

            if ch == ' ' && self.params.timing.word_pause {
                let pause = self.sampler.sample(WORD_PAUSE_MIN_MS, WORD_PAUSE_MAX_MS);
                tokio::time::sleep(Duration::from_millis(pause)).await;
            }
        }
        LoopExit::Completed
    }

    /// Sends one report; a transport error aborts the session.
    async fn send(&self, report: &InputReport) -> bool {
        match self
            .params
            .transport
            .send_report(&self.params.device, report)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(session = %self.id, error = %e, "report send failed; aborting session");
                false
            }
        }
    }

    fn effective_delay(&mut self) -> Duration {
        let mut ms = self.params.timing.base_delay_ms;
        if self.params.timing.letter_jitter {
            ms += self.sampler.sample(JITTER_MIN_MS, JITTER_MAX_MS);
        }
        Duration::from_millis(ms)
    }
}

/// Uniform integer sampler seeded from wall-clock time and a counter.
///
/// The pack-standard entropy source: keystroke cadence needs no
/// cryptographic quality, only enough spread that consecutive samples
/// differ.  The counter keeps samples distinct even when two are drawn
/// within the clock's resolution.
pub(crate) struct UniformSampler {
    counter: u64,
}

impl UniformSampler {
    pub(crate) fn new() -> Self {
        Self { counter: 0 }
    }

    /// Draws a value in `min..=max`.
    pub(crate) fn sample(&mut self, min: u64, max: u64) -> u64 {
        let mut hasher = DefaultHasher::new();
        SystemTime::now().hash(&mut hasher);
        self.counter.hash(&mut hasher);
        self.counter = self.counter.wrapping_add(1);
        min + hasher.finish() % (max - min + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::engine::status_cell_for_tests;
    use crate::infrastructure::transport::loopback::LoopbackTransport;
    use crate::infrastructure::transport::{EngineEvent, KeyboardDescriptor};
    use hidkb_core::ConnectionStatus;
    use tokio::sync::mpsc;

    // ── Sampler ───────────────────────────────────────────────────────────────

    #[test]
    fn test_sampler_stays_within_inclusive_bounds() {
        let mut sampler = UniformSampler::new();
        for _ in 0..1000 {
            let v = sampler.sample(5, 50);
            assert!((5..=50).contains(&v), "sample {v} out of range");
        }
    }

    #[test]
    fn test_sampler_produces_varied_values() {
        let mut sampler = UniformSampler::new();
        let samples: Vec<u64> = (0..100).map(|_| sampler.sample(5, 400)).collect();
        let first = samples[0];
        assert!(
            samples.iter().any(|&v| v != first),
            "100 consecutive samples were all {first}"
        );
    }

    #[test]
    fn test_sampler_degenerate_range_is_constant() {
        let mut sampler = UniformSampler::new();
        for _ in 0..10 {
            assert_eq!(sampler.sample(7, 7), 7);
        }
    }

    // ── Worker ────────────────────────────────────────────────────────────────

    struct Fixture {
        transport: Arc<LoopbackTransport>,
        state_machine: Arc<Mutex<ConnectionStateMachine>>,
        status: Arc<StatusCell>,
        session_active: Arc<AtomicBool>,
        _events: mpsc::Receiver<EngineEvent>,
        _status_rx: mpsc::Receiver<EngineStatus>,
    }

    async fn connected_fixture() -> Fixture {
        let (tx, events) = mpsc::channel(64);
        let transport = Arc::new(LoopbackTransport::new(tx));
        transport
            .register_keyboard(&KeyboardDescriptor::default())
            .await
            .unwrap();

        let mut sm = ConnectionStateMachine::new();
        sm.request_registration();
        sm.registration_confirmed();
        sm.request_connect(device());
        sm.link_connected(device());

        let (status, _status_rx) = status_cell_for_tests();
        Fixture {
            transport,
            state_machine: Arc::new(Mutex::new(sm)),
            status,
            session_active: Arc::new(AtomicBool::new(true)),
            _events: events,
            _status_rx,
        }
    }

    fn device() -> Device {
        Device::bonded("AA:BB:CC:DD:EE:FF", "host")
    }

    fn start(fixture: &Fixture, text: &str, timing: TimingConfig) -> TypingSession {
        spawn_session(SessionParams {
            text: text.to_string(),
            timing,
            device: device(),
            transport: Arc::clone(&fixture.transport) as Arc<dyn Transport>,
            state_machine: Arc::clone(&fixture.state_machine),
            status: Arc::clone(&fixture.status),
            session_active: Arc::clone(&fixture.session_active),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_hi_bang_sends_exactly_six_reports_in_order() {
        // Arrange: "Hi!" at 25 ms, jitter and word pause disabled.
        let fixture = connected_fixture().await;
        let timing = TimingConfig::new(25, false, false).unwrap();
        let started = tokio::time::Instant::now();

        // Act
        let session = start(&fixture, "Hi!", timing);
        session.join().await;

        // Assert: down('H'+shift), up, down('i'), up, down('!' = '1'+shift), up.
        let reports = fixture.transport.sent_reports();
        let expected = vec![
            InputReport::key_down(0x0B, 0x02),
            InputReport::key_up(),
            InputReport::key_down(0x0C, 0x00),
            InputReport::key_up(),
            InputReport::key_down(0x1E, 0x02),
            InputReport::key_up(),
        ];
        assert_eq!(reports, expected);

        // Two 25 ms phases per character, three characters: 150 ms virtual time.
        assert_eq!(started.elapsed(), Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_characters_consume_base_delay_without_reports() {
        let fixture = connected_fixture().await;
        let timing = TimingConfig::new(25, false, false).unwrap();
        let started = tokio::time::Instant::now();

        // 'é' and '€' are unmapped; only 'a' produces reports.
        let session = start(&fixture, "éa€", timing);
        session.join().await;

        assert_eq!(fixture.transport.report_count(), 2);
        // Two no-op delays (25 each) + one full character (50).
        assert_eq!(started.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_word_pause_adds_delay_after_space_only() {
        let fixture = connected_fixture().await;
        let timing = TimingConfig::new(10, false, true).unwrap();
        let started = tokio::time::Instant::now();

        let session = start(&fixture, "a b", timing);
        session.join().await;

        assert_eq!(fixture.transport.report_count(), 6);
        // Base cost is 3 chars * 20 ms = 60 ms; the word pause adds 5–400 ms
        // exactly once, after the space.
        let extra = started.elapsed() - Duration::from_millis(60);
        assert!(
            (Duration::from_millis(5)..=Duration::from_millis(400)).contains(&extra),
            "word pause of {extra:?} outside 5–400 ms"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_extends_every_phase_within_bounds() {
        let fixture = connected_fixture().await;
        let timing = TimingConfig::new(10, true, false).unwrap();
        let started = tokio::time::Instant::now();

        let session = start(&fixture, "abc", timing);
        session.join().await;

        // Six phases of 10 ms base + 5..=50 ms jitter each.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(6 * 15), "{elapsed:?}");
        assert!(elapsed <= Duration::from_millis(6 * 60), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_before_the_next_character() {
        let fixture = connected_fixture().await;
        let timing = TimingConfig::new(200, false, false).unwrap();

        let session = start(&fixture, "abcdefgh", timing);
        // Let the first character start, then cancel.
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.request_stop();
        session.join().await;

        // Only the in-flight character finishes: exactly one down/up pair.
        assert_eq!(fixture.transport.report_count(), 2);
        assert!(!fixture.session_active.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exit_restores_status_from_live_connection_state() {
        let fixture = connected_fixture().await;
        fixture.status.set(EngineStatus::Typing);
        let timing = TimingConfig::new(5, false, false).unwrap();

        let session = start(&fixture, "ok", timing);
        session.join().await;

        assert_eq!(
            fixture.status.get(),
            EngineStatus::Connection(ConnectionStatus::PairedReady)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_aborts_session_without_touching_connection_state() {
        let fixture = connected_fixture().await;
        fixture.transport.set_fail_sends(true);
        let timing = TimingConfig::new(5, false, false).unwrap();

        let session = start(&fixture, "abcdef", timing);
        session.join().await;

        // First send fails; nothing is recorded and the worker exits.
        assert_eq!(fixture.transport.report_count(), 0);
        assert!(!fixture.session_active.load(Ordering::SeqCst));
        // The worker itself does not mutate the state machine; the engine's
        // event pump owns that (exercised in the integration tests).
        let sm = fixture.state_machine.lock().await;
        assert_eq!(*sm.status(), ConnectionStatus::PairedReady);
    }
}
