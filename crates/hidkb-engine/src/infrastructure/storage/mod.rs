//! Persistence for engine settings.

pub mod config;
