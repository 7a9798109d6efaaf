//! Error types for `airpods-probe`.
//!
//! This module defines all error types that can occur while decoding model
//! identifiers, loading configuration, or reading GATT characteristics
//! through the platform Bluetooth stacks.

use smol_str::SmolStr;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum AirPodsError {
   #[cfg(target_os = "linux")]
   #[error("Bluetooth error: {0}")]
   Bluetooth(#[from] bluer::Error),

   #[cfg(target_os = "linux")]
   #[error("D-Bus error: {0}")]
   DBus(#[from] zbus::Error),

   #[cfg(windows)]
   #[error("WinRT error: {0}")]
   WinRt(#[from] windows::core::Error),

   #[error("I/O error: {0}")]
   Io(#[from] std::io::Error),

   #[error("Invalid UUID: {0}")]
   InvalidUuid(#[from] uuid::Error),

   #[error("Invalid device identifier: {0}")]
   InvalidDeviceId(SmolStr),

   #[error("Missing {0} UUID")]
   MissingUuid(&'static str),

   #[error("Device not found: {0}")]
   DeviceNotFound(SmolStr),

   #[error("Device not connected")]
   DeviceNotConnected,

   #[error("Service not found: {0}")]
   ServiceNotFound(Uuid),

   #[error("Characteristic not found: {0}")]
   CharacteristicNotFound(Uuid),

   #[error("Characteristic UUID mismatch: expected {expected}, found {actual}")]
   CharacteristicMismatch { expected: Uuid, actual: SmolStr },

   #[error("Read failed: {0}")]
   ReadFailed(SmolStr),

   #[error("Request timeout")]
   RequestTimeout,

   #[error("Blocking read called from inside an async runtime")]
   BlockingInRuntime,

   #[error("Bluetooth LE reads are not supported on this platform")]
   UnsupportedPlatform,

   #[error("Invalid payload: {0}")]
   InvalidPayload(#[from] hex::FromHexError),

   #[error("Could not determine config directory")]
   ConfigDirNotFound,

   #[error("TOML parsing error: {0}")]
   TomlParse(#[from] toml::de::Error),

   #[error("TOML serialization error: {0}")]
   TomlSerialize(#[from] toml::ser::Error),
}

/// Convenience type alias for Results with `AirPodsError`.
pub type Result<T> = std::result::Result<T, AirPodsError>;
