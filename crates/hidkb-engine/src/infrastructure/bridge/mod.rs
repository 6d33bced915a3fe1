//! Serializable command surface over the engine.
//!
//! A thin adapter for embedding the engine behind an IPC or UI boundary:
//! every operation takes plain serializable inputs, returns a
//! [`CommandResult`], and never panics across the boundary.  Errors are
//! flattened to display strings so the far side needs no knowledge of
//! [`EngineError`]'s variants.

use serde::{Deserialize, Serialize};
use tracing::debug;

use hidkb_core::Device;

use crate::application::engine::{EngineError, KeyboardEngine};

/// Uniform envelope every command returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl<T> From<Result<T, EngineError>> for CommandResult<T> {
    fn from(result: Result<T, EngineError>) -> Self {
        match result {
            Ok(data) => CommandResult::ok(data),
            Err(e) => CommandResult::err(format!("Error: {e}")),
        }
    }
}

/// Bonded device as shown in a host-side picker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDto {
    pub name: String,
    pub address: String,
}

impl From<Device> for DeviceDto {
    fn from(device: Device) -> Self {
        Self {
            name: device.name,
            address: device.address,
        }
    }
}

/// Inputs for one typing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartTypingRequest {
    pub text: String,
    pub delay_ms: u64,
    #[serde(default)]
    pub letter_jitter: bool,
    #[serde(default)]
    pub word_pause: bool,
}

pub async fn initialize(engine: &KeyboardEngine) -> CommandResult<String> {
    engine.initialize().await.into()
}

pub async fn get_paired_devices(engine: &KeyboardEngine) -> CommandResult<Vec<DeviceDto>> {
    let devices = engine
        .get_paired_devices()
        .into_iter()
        .map(DeviceDto::from)
        .collect();
    CommandResult::ok(devices)
}

pub async fn connect_to_device(engine: &KeyboardEngine, address: &str) -> CommandResult<String> {
    engine.connect_to_device(address).await.into()
}

pub async fn make_discoverable(engine: &KeyboardEngine) -> CommandResult<String> {
    engine.make_discoverable().await.into()
}

pub async fn start_typing(
    engine: &KeyboardEngine,
    request: StartTypingRequest,
) -> CommandResult<String> {
    debug!(chars = request.text.chars().count(), "start_typing command");
    engine
        .start_typing(
            &request.text,
            request.delay_ms,
            request.letter_jitter,
            request.word_pause,
        )
        .await
        .into()
}

pub async fn stop_typing(engine: &KeyboardEngine) -> CommandResult<String> {
    engine.stop_typing().into()
}

pub async fn get_status(engine: &KeyboardEngine) -> CommandResult<String> {
    CommandResult::ok(engine.get_status().to_string())
}
