//! Domain entities shared by the engine and its tests.
//!
//! Everything here is pure data: no I/O, no async, no radio.  The engine
//! crate owns all the behaviour that mutates these values.

pub mod device;
pub mod status;
pub mod timing;

pub use device::Device;
pub use status::ConnectionStatus;
pub use timing::{TimingConfig, TimingConfigError};
