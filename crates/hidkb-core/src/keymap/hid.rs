//! USB HID usage codes (page 0x07, Keyboard/Keypad page) and modifier masks.
//!
//! These are the raw byte values that end up inside a boot-protocol input
//! report. Reference: USB HID Usage Tables 1.3, Section 10 (Keyboard/Keypad
//! page 0x07).
//!
//! # What is a usage code? (for beginners)
//!
//! The **USB Human Interface Device (HID)** standard assigns a unique number
//! to every key on a keyboard.  These numbers are called *usage codes* and
//! they are grouped by *usage page*; all keyboard keys live on page 0x07.
//!
//! | Key      | Usage code |
//! |----------|-----------|
//! | Letter A | 0x04      |
//! | Enter    | 0x28      |
//! | Space    | 0x2C      |
//!
//! Usage codes identify **physical key positions**, not characters: there is
//! no usage code for `'A'` versus `'a'`.  The uppercase letter is produced by
//! sending the same usage code with the shift bit set in the modifier byte.
//! That is exactly what [`crate::keymap::KeyMap`] encodes.
//!
//! # The modifier byte
//!
//! Byte 0 of every boot-protocol report is a bitmask of the eight modifier
//! keys (HID usages 0xE0–0xE7, one bit each).  The emulator only ever sets
//! the left-shift bit, but the full mask layout is reserved on the wire.

/// Highest usage code on the keyboard page produced by the US-QWERTY table
/// (0x38, `/` and `?`). Codes up to 0x65 exist on the page; the boot report
/// format itself accepts anything in `0x00..=0x65`.
pub const MAX_KEYBOARD_USAGE: u8 = 0x65;

/// Usage code for a key with no mapping. Never transmitted.
pub const USAGE_NONE: u8 = 0x00;

/// First letter usage (`a`/`A`).
pub const USAGE_A: u8 = 0x04;
/// First digit-row usage (`1`/`!`).
pub const USAGE_1: u8 = 0x1E;
/// Digit-row usage for `0`/`)`.
pub const USAGE_0: u8 = 0x27;
/// Enter (produced for `'\n'`).
pub const USAGE_ENTER: u8 = 0x28;
/// Tab.
pub const USAGE_TAB: u8 = 0x2B;
/// Space bar.
pub const USAGE_SPACE: u8 = 0x2C;
/// First punctuation usage (`-`/`_`); the run `- = [ ] \ ; ' \` , . /`
/// occupies 0x2D..=0x38 contiguously.
pub const USAGE_MINUS: u8 = 0x2D;

// ── Modifier bitmask (report byte 0) ─────────────────────────────────────────

/// No modifier held.
pub const MOD_NONE: u8 = 0x00;
/// Left Ctrl (bit 0).
pub const MOD_LEFT_CTRL: u8 = 0x01;
/// Left Shift (bit 1). The only modifier the US-QWERTY table produces.
pub const MOD_LEFT_SHIFT: u8 = 0x02;
/// Left Alt (bit 2).
pub const MOD_LEFT_ALT: u8 = 0x04;
/// Left Meta/GUI (bit 3).
pub const MOD_LEFT_META: u8 = 0x08;

/// Returns `true` if `usage` is a valid keyboard-page usage for a boot report.
pub fn is_keyboard_usage(usage: u8) -> bool {
    usage <= MAX_KEYBOARD_USAGE
}
