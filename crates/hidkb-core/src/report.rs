//! Boot-protocol input report codec.
//!
//! Wire format (8 bytes, no report-ID prefix):
//! ```text
//! [modifiers:1][reserved:1][key1:1][key2:1][key3:1][key4:1][key5:1][key6:1]
//! ```
//!
//! # What is the boot protocol? (for beginners)
//!
//! Full-featured HID devices describe their report layout with a *report
//! descriptor* that the host must parse.  The **boot protocol** skips all of
//! that: it is a fixed 8-byte keyboard layout that every BIOS, firmware, and
//! OS driver understands without a descriptor parser.  Byte 0 carries the
//! modifier bitmask, byte 1 is reserved, and bytes 2–7 carry up to six
//! simultaneously pressed usage codes.
//!
//! This emulator presses one logical key at a time, so key slots 3–7 are
//! always zero: a key-down report carries the active usage in slot 2, and the
//! canonical "all keys released" state is the all-zero report.
//!
//! The codec is pure.  An out-of-range usage code is a programming error in
//! the caller (the [`crate::keymap::KeyMap`] never produces one), enforced
//! with a debug assertion rather than a runtime error path.

use serde::{Deserialize, Serialize};

use crate::keymap::hid::is_keyboard_usage;

/// Size of a boot-protocol keyboard input report in bytes.
pub const REPORT_SIZE: usize = 8;

/// One fixed-size boot-protocol input report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputReport([u8; REPORT_SIZE]);

impl InputReport {
    /// Builds a key-down report for a single usage code with the given
    /// modifier bitmask held.
    ///
    /// # Panics
    ///
    /// Debug builds assert that `usage` is on the keyboard page; release
    /// builds truncate nothing and simply emit the byte as given.
    pub fn key_down(usage: u8, modifier: u8) -> Self {
        debug_assert!(
            is_keyboard_usage(usage),
            "usage 0x{usage:02X} is outside the keyboard page"
        );
        let mut bytes = [0u8; REPORT_SIZE];
        bytes[0] = modifier;
        // bytes[1] is reserved, always 0
        bytes[2] = usage;
        Self(bytes)
    }

    /// The all-zero "no keys pressed" report.  Sending it releases whatever
    /// key (and modifier) the previous report held down.
    pub const fn key_up() -> Self {
        Self([0u8; REPORT_SIZE])
    }

    /// Raw wire bytes.
    pub fn as_bytes(&self) -> &[u8; REPORT_SIZE] {
        &self.0
    }

    /// Modifier bitmask (byte 0).
    pub fn modifier(&self) -> u8 {
        self.0[0]
    }

    /// The usage code in the first key slot (byte 2); 0 when no key is down.
    pub fn first_key(&self) -> u8 {
        self.0[2]
    }

    /// Returns `true` if this is the all-zero released state.
    pub fn is_release(&self) -> bool {
        self.0 == [0u8; REPORT_SIZE]
    }
}

impl From<[u8; REPORT_SIZE]> for InputReport {
    fn from(bytes: [u8; REPORT_SIZE]) -> Self {
        Self(bytes)
    }
}
