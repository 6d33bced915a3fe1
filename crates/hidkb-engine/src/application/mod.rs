//! Application layer: the connection state machine, typing sessions, and the
//! `KeyboardEngine` composition root that arbitrates between them.

pub mod connection;
pub mod engine;
pub mod typing;
