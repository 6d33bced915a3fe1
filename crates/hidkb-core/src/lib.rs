//! # hidkb-core
//!
//! Shared library for the hidkb keyboard emulator containing the
//! character-to-usage lookup table, the boot-protocol report codec, and the
//! domain entities shared by the engine and its tests.
//!
//! This crate has zero dependencies on OS APIs, async runtimes, or radios.
//!
//! # Architecture overview (for beginners)
//!
//! hidkb makes a computer *pretend to be a keyboard*.  A host (laptop, phone,
//! game console) that connects to it sees an ordinary USB/Bluetooth HID
//! keyboard.  Text handed to the engine is replayed as a stream of
//! key-down/key-up *input reports*, so whatever application has focus on the
//! host receives real keystrokes.
//!
//! This crate is the pure foundation.  It defines:
//!
//! - **`keymap`** – The deterministic translation from a Unicode character to
//!   a (usage code, modifier) pair on the HID Keyboard/Keypad page, covering
//!   the printable US-QWERTY set.
//!
//! - **`report`** – The fixed 8-byte boot-protocol input report: how a
//!   (usage, modifier) pair is laid out on the wire, and the all-zero
//!   "no keys pressed" report.
//!
//! - **`domain`** – Entities with no I/O: the bonded [`Device`] snapshot, the
//!   per-session [`TimingConfig`], and the externally visible
//!   [`ConnectionStatus`] enumeration.

pub mod domain;
pub mod keymap;
pub mod report;

// Re-export the most-used types at the crate root so callers can write
// `hidkb_core::KeyMap` instead of `hidkb_core::keymap::KeyMap`.
pub use domain::device::Device;
pub use domain::status::ConnectionStatus;
pub use domain::timing::{TimingConfig, TimingConfigError};
pub use keymap::{KeyMap, KeyMapping};
pub use report::InputReport;
