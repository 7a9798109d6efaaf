//! Foreign-call boundaries.
//!
//! Entry points that expose model decoding to code running outside Rust.

use smol_str::SmolStr;

use crate::airpods::model::{UNKNOWN_MODEL_NAME, describe_payload};

#[cfg(target_os = "android")]
pub mod android;

/// Names the accessory for a payload handed over by foreign code.
///
/// `None` stands for a null or unreadable array.
pub fn payload_name(bytes: Option<&[u8]>) -> SmolStr {
   bytes.map_or_else(|| SmolStr::new_static(UNKNOWN_MODEL_NAME), describe_payload)
}
