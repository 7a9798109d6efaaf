//! `AirPods` model identification.
//!
//! This module contains the model table and the decoding of model IDs from
//! GATT payloads and Apple advertisement data.

pub mod model;
pub mod recognition;

pub use model::{Model, ModelInfo, UNKNOWN_MODEL_NAME, describe_payload, fallback_name, model_name};
