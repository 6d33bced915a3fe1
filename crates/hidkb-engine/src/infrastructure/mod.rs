//! Infrastructure layer: the capability seams the engine consumes and the
//! adapters that implement them without a real radio.

pub mod bridge;
pub mod registry;
pub mod storage;
pub mod transport;
