//! `AirPods` model identification and Bluetooth LE characteristic reads.
//!
//! Model IDs are decoded from GATT payloads and Apple advertisement data;
//! characteristic values are read through BlueZ on Linux and WinRT on
//! Windows. An Android JNI entry point exposes the decoder to Java.

pub mod airpods;
pub mod bluetooth;
pub mod config;
pub mod error;
pub mod ffi;

pub use crate::{
   airpods::{Model, ModelInfo, describe_payload, model_name},
   bluetooth::{read_characteristic, read_characteristic_blocking},
   error::{AirPodsError, Result},
};
