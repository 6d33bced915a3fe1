//! hidkb-engine library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/` and
//! the binary entry point in `main.rs` share the same module tree.
//!
//! # What does hidkb-engine do? (for beginners)
//!
//! The engine turns this machine into a fake keyboard for some *host*
//! computer.  The host bonds with us like it would with any Bluetooth
//! keyboard; once a connection is up, the engine accepts a block of text and
//! replays it as key-down/key-up HID input reports, so the host's focused
//! application receives ordinary keystrokes.
//!
//! The engine:
//!
//! 1. Registers as a HID boot-protocol keyboard with the platform transport.
//! 2. Tracks registration/bonding/connection progress in an explicit state
//!    machine fed by a single ordered event stream.
//! 3. Runs at most one typing session at a time on a background Tokio task,
//!    translating characters through `hidkb-core`'s KeyMap and ReportCodec
//!    with a configurable, human-like cadence.
//! 4. Pushes every externally visible status change to an observer channel.
//!
//! The radio itself is out of scope: the engine talks to a [`Transport`]
//! capability (send a report, connect, events) and a [`DeviceRegistry`]
//! capability (bonded-device snapshots, bonding events).
//!
//! [`Transport`]: infrastructure::transport::Transport
//! [`DeviceRegistry`]: infrastructure::registry::DeviceRegistry

/// Application layer: state machine, typing sessions, engine composition root.
pub mod application;

/// Infrastructure layer: capability traits, loopback adapters, config, bridge.
pub mod infrastructure;

pub use application::engine::{EngineError, EngineStatus, KeyboardEngine};
pub use infrastructure::transport::{EngineEvent, LinkState, Transport, TransportError};
