//! Per-session typing cadence configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum accepted per-character base delay in milliseconds.
pub const MIN_BASE_DELAY_MS: u64 = 5;
/// Maximum accepted per-character base delay in milliseconds.
pub const MAX_BASE_DELAY_MS: u64 = 200;

/// Maximum extra delay added per keystroke when letter jitter is enabled.
/// Sampled uniformly from 5..=50 ms.
pub const JITTER_MIN_MS: u64 = 5;
pub const JITTER_MAX_MS: u64 = 50;

/// Extra pause bounds applied once after a space when word pause is enabled.
/// Sampled uniformly from 5..=400 ms.
pub const WORD_PAUSE_MIN_MS: u64 = 5;
pub const WORD_PAUSE_MAX_MS: u64 = 400;

/// Error type for timing configuration validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimingConfigError {
    /// The base delay is outside the accepted `[5, 200]` ms window.
    #[error("base delay {0} ms is outside the accepted range {MIN_BASE_DELAY_MS}..={MAX_BASE_DELAY_MS} ms")]
    DelayOutOfRange(u64),
}

/// Immutable timing policy for one typing session.
///
/// Supplied when the session is created and unchanged for its lifetime.
/// `base_delay_ms` is both the down→up hold time and the up→next-key gap;
/// `letter_jitter` and `word_pause` add human-like variance on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Base per-phase delay in milliseconds, within `[5, 200]`.
    pub base_delay_ms: u64,
    /// Add a uniformly random 5–50 ms to each keystroke phase.
    pub letter_jitter: bool,
    /// Add a uniformly random 5–400 ms once after each space.
    pub word_pause: bool,
}

impl TimingConfig {
    /// Validating constructor.
    ///
    /// # Errors
    ///
    /// Returns [`TimingConfigError::DelayOutOfRange`] if `base_delay_ms` is
    /// outside `[5, 200]`.
    pub fn new(
        base_delay_ms: u64,
        letter_jitter: bool,
        word_pause: bool,
    ) -> Result<Self, TimingConfigError> {
        if !(MIN_BASE_DELAY_MS..=MAX_BASE_DELAY_MS).contains(&base_delay_ms) {
            tracing::warn!(base_delay_ms, "rejecting out-of-range base delay");
            return Err(TimingConfigError::DelayOutOfRange(base_delay_ms));
        }
        Ok(Self {
            base_delay_ms,
            letter_jitter,
            word_pause,
        })
    }
}

impl Default for TimingConfig {
    /// A comfortable default: 25 ms base delay, no jitter, no word pauses.
    fn default() -> Self {
        Self {
            base_delay_ms: 25,
            letter_jitter: false,
            word_pause: false,
        }
    }
}
