//! JNI bridge for the Android app.
//!
//! Exposes payload decoding to `com.yourco.airpods.NativeBridge`.

use jni::{
   JNIEnv,
   objects::{JByteArray, JObject},
   sys::jstring,
};
use log::{error, warn};

use crate::ffi::payload_name;

/// `NativeBridge.parseAirPodsPayload(byte[]): String`
///
/// Decodes the little-endian model ID from the first two bytes of `payload`.
/// Returns null only if the Java string cannot be allocated.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_yourco_airpods_NativeBridge_parseAirPodsPayload<'local>(
   mut env: JNIEnv<'local>,
   _this: JObject<'local>,
   payload: JByteArray<'local>,
) -> jstring {
   let bytes = env
      .convert_byte_array(&payload)
      .inspect_err(|e| warn!("Unreadable payload array: {e}"))
      .ok();
   let name = payload_name(bytes.as_deref());

   match env.new_string(name.as_str()) {
      Ok(s) => s.into_raw(),
      Err(e) => {
         error!("Failed to create Java string: {e}");
         std::ptr::null_mut()
      },
   }
}
