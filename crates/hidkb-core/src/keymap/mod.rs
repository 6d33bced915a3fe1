//! Character → (usage code, modifier) translation for US-QWERTY text entry.
//!
//! This is the deterministic front half of the typing pipeline: every Unicode
//! character the engine is asked to type is resolved here to the HID usage
//! code and modifier byte that reproduce it on a US-QWERTY host, or to
//! "unsupported" for anything outside the printable ASCII set.
//!
//! The table is pure arithmetic plus a fixed punctuation match; it is built
//! into the code, immutable, and identical for every session.
//!
//! # Why shift is part of the mapping (for beginners)
//!
//! A HID keyboard does not send characters, it sends key *positions*.  `'a'`
//! and `'A'` are the same physical key (usage 0x04); the host decides which
//! character it produces based on the modifier byte travelling in the same
//! report.  So `'A'` maps to `(0x04, left-shift)` and `'!'` maps to the `1`
//! key with left-shift held.  Exactly one logical key is ever active at a
//! time — chords are out of scope.

pub mod hid;

use serde::{Deserialize, Serialize};

use hid::{
    MOD_LEFT_SHIFT, MOD_NONE, USAGE_0, USAGE_1, USAGE_A, USAGE_ENTER, USAGE_MINUS, USAGE_SPACE,
    USAGE_TAB,
};

/// One resolved key: the usage code on the keyboard page plus the modifier
/// byte that must be held while it is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyMapping {
    /// HID usage code on the Keyboard/Keypad page (0x07).
    pub usage: u8,
    /// Modifier bitmask for report byte 0; `MOD_NONE` or `MOD_LEFT_SHIFT`.
    pub modifier: u8,
}

impl KeyMapping {
    /// Creates a mapping from a usage code and modifier mask.
    pub const fn new(usage: u8, modifier: u8) -> Self {
        Self { usage, modifier }
    }

    /// Returns `true` if this mapping requires shift to be held.
    pub fn shifted(self) -> bool {
        self.modifier & MOD_LEFT_SHIFT != 0
    }
}

/// The static US-QWERTY character table.
pub struct KeyMap;

impl KeyMap {
    /// Resolves `c` to its usage code and modifier byte.
    ///
    /// Returns `None` for any character outside the supported set; the engine
    /// treats such characters as timing-preserving no-ops (the scheduled
    /// per-character delay still elapses, but no report is sent).
    pub fn lookup(c: char) -> Option<KeyMapping> {
        let unshifted = |usage| Some(KeyMapping::new(usage, MOD_NONE));
        let shifted = |usage| Some(KeyMapping::new(usage, MOD_LEFT_SHIFT));

        match c {
            // Letters: 'a'..'z' occupy usages 0x04..0x1D contiguously.
            // Uppercase is the same key with left shift held.
            'a'..='z' => unshifted(USAGE_A + (c as u8 - b'a')),
            'A'..='Z' => shifted(USAGE_A + (c as u8 - b'A')),

            // Digit row: '1'..'9' occupy 0x1E..0x26; '0' wraps to 0x27.
            '1'..='9' => unshifted(USAGE_1 + (c as u8 - b'1')),
            '0' => unshifted(USAGE_0),

            // Whitespace and control characters with dedicated keys.
            ' ' => unshifted(USAGE_SPACE),
            '\n' => unshifted(USAGE_ENTER),
            '\t' => unshifted(USAGE_TAB),

            // Unshifted punctuation run 0x2D..0x38.
            '-' => unshifted(USAGE_MINUS),
            '=' => unshifted(0x2E),
            '[' => unshifted(0x2F),
            ']' => unshifted(0x30),
            '\\' => unshifted(0x31),
            ';' => unshifted(0x33),
            '\'' => unshifted(0x34),
            '`' => unshifted(0x35),
            ',' => unshifted(0x36),
            '.' => unshifted(0x37),
            '/' => unshifted(0x38),

            // Shifted digit row: '!'..')' reuse the digit usages with shift.
            '!' => shifted(0x1E),
            '@' => shifted(0x1F),
            '#' => shifted(0x20),
            '$' => shifted(0x21),
            '%' => shifted(0x22),
            '^' => shifted(0x23),
            '&' => shifted(0x24),
            '*' => shifted(0x25),
            '(' => shifted(0x26),
            ')' => shifted(USAGE_0),

            // Shifted punctuation: same usages as the unshifted counterparts.
            '_' => shifted(0x2D),
            '+' => shifted(0x2E),
            '{' => shifted(0x2F),
            '}' => shifted(0x30),
            '|' => shifted(0x31),
            ':' => shifted(0x33),
            '"' => shifted(0x34),
            '~' => shifted(0x35),
            '<' => shifted(0x36),
            '>' => shifted(0x37),
            '?' => shifted(0x38),

            _ => None,
        }
    }

    /// Returns `true` if `c` has a mapping.
    pub fn is_supported(c: char) -> bool {
        Self::lookup(c).is_some()
    }

    /// Collects the distinct unsupported characters in `text`, in order of
    /// first appearance.  Used by the engine to log a warning before a typing
    /// session starts.
    pub fn unsupported_chars(text: &str) -> Vec<char> {
        let mut seen = Vec::new();
        for c in text.chars() {
            if !Self::is_supported(c) && !seen.contains(&c) {
                seen.push(c);
            }
        }
        seen
    }
}
