//! Bluetooth LE characteristic access.
//!
//! This module provides a single characteristic read that is dispatched to
//! the native stack of the host: BlueZ over D-Bus on Linux and WinRT on
//! Windows.

use std::{future::Future, time::Duration};

use log::{debug, info};
use smol_str::SmolStr;
use tokio::{runtime, time};
use uuid::Uuid;

use crate::error::{AirPodsError, Result};

#[cfg(target_os = "linux")]
pub mod bluez;
#[cfg(target_os = "linux")]
pub mod scan;
#[cfg(windows)]
pub mod winrt;

/// Bluetooth Base UUID, used to expand 16-bit and 32-bit UUIDs.
pub const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

/// Default time allowed for a single characteristic read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(5000);

pub const fn uuid_from_u32(short: u32) -> Uuid {
   Uuid::from_u128(((short as u128) << 96) | BLUETOOTH_BASE_UUID)
}

/// Parses a UUID in full, hyphenless, braced (WinRT) or 16/32-bit short form.
pub fn parse_uuid(s: &str) -> Result<Uuid> {
   let s = s.trim();
   let s = s
      .strip_prefix('{')
      .and_then(|s| s.strip_suffix('}'))
      .unwrap_or(s);
   let short = s
      .strip_prefix("0x")
      .or_else(|| s.strip_prefix("0X"))
      .unwrap_or(s);
   if matches!(short.len(), 4 | 8)
      && short.bytes().all(|b| b.is_ascii_hexdigit())
      && let Ok(v) = u32::from_str_radix(short, 16)
   {
      return Ok(uuid_from_u32(v));
   }
   Ok(Uuid::parse_str(s)?)
}

fn parse_optional_uuid(s: &str) -> Result<Option<Uuid>> {
   if s.trim().is_empty() {
      Ok(None)
   } else {
      parse_uuid(s).map(Some)
   }
}

/// A characteristic to read, addressed by device and UUIDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicRequest {
   /// BlueZ object path, Bluetooth address, or WinRT device ID.
   pub device: SmolStr,
   pub service: Option<Uuid>,
   pub characteristic: Option<Uuid>,
   /// Local adapter to resolve addresses on (BlueZ only).
   pub adapter: Option<SmolStr>,
}

impl CharacteristicRequest {
   /// Builds a request from its string form. Empty UUID strings are left unset.
   pub fn new(device_id: &str, service_uuid: &str, characteristic_uuid: &str) -> Result<Self> {
      let device = device_id.trim();
      if device.is_empty() {
         return Err(AirPodsError::InvalidDeviceId(device.into()));
      }
      Ok(Self {
         device: device.into(),
         service: parse_optional_uuid(service_uuid)?,
         characteristic: parse_optional_uuid(characteristic_uuid)?,
         adapter: None,
      })
   }

   #[must_use]
   pub fn on_adapter(mut self, adapter: Option<&str>) -> Self {
      self.adapter = adapter.map(SmolStr::from);
      self
   }

   pub fn require_service(&self) -> Result<Uuid> {
      self.service.ok_or(AirPodsError::MissingUuid("service"))
   }

   pub fn require_characteristic(&self) -> Result<Uuid> {
      self
         .characteristic
         .ok_or(AirPodsError::MissingUuid("characteristic"))
   }
}

/// Reads the raw value of a GATT characteristic.
///
/// The read is a single round trip through the platform stack, bounded by
/// `timeout`.
pub async fn read_characteristic(
   device_id: &str,
   service_uuid: &str,
   characteristic_uuid: &str,
   timeout: Duration,
) -> Result<Vec<u8>> {
   let request = CharacteristicRequest::new(device_id, service_uuid, characteristic_uuid)?;
   read(&request, timeout).await
}

/// Reads a characteristic described by a prepared request.
pub async fn read(request: &CharacteristicRequest, timeout: Duration) -> Result<Vec<u8>> {
   debug!("Reading characteristic {request:?}");
   let value = with_timeout(timeout, read_native(request)).await?;
   info!("Read {} bytes from {}", value.len(), request.device);
   debug!("← {}: {}", request.device, hex::encode(&value));
   Ok(value)
}

/// Bounds `fut` by `timeout`, mapping expiry to `RequestTimeout`.
pub async fn with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T>
where
   F: Future<Output = Result<T>>,
{
   time::timeout(timeout, fut)
      .await
      .map_err(|_| AirPodsError::RequestTimeout)?
}

/// Synchronous form of [`read_characteristic`] for callers outside async code.
///
/// Fails with `BlockingInRuntime` when called from a thread that is already
/// driving a tokio runtime.
pub fn read_characteristic_blocking(
   device_id: &str,
   service_uuid: &str,
   characteristic_uuid: &str,
   timeout: Duration,
) -> Result<Vec<u8>> {
   if runtime::Handle::try_current().is_ok() {
      return Err(AirPodsError::BlockingInRuntime);
   }
   let rt = runtime::Builder::new_current_thread().enable_all().build()?;
   rt.block_on(read_characteristic(
      device_id,
      service_uuid,
      characteristic_uuid,
      timeout,
   ))
}

#[cfg(target_os = "linux")]
async fn read_native(request: &CharacteristicRequest) -> Result<Vec<u8>> {
   bluez::read_characteristic(request).await
}

#[cfg(windows)]
async fn read_native(request: &CharacteristicRequest) -> Result<Vec<u8>> {
   winrt::read_characteristic(request).await
}

#[cfg(not(any(target_os = "linux", windows)))]
async fn read_native(_request: &CharacteristicRequest) -> Result<Vec<u8>> {
   Err(AirPodsError::UnsupportedPlatform)
}

#[cfg(test)]
mod tests {
   use super::*;

   const BATTERY_LEVEL: Uuid = Uuid::from_u128(0x00002a19_0000_1000_8000_00805f9b34fb);

   #[test]
   fn short_uuids_expand_with_base() {
      assert_eq!(parse_uuid("2a19").unwrap(), BATTERY_LEVEL);
      assert_eq!(parse_uuid("0x2A19").unwrap(), BATTERY_LEVEL);
      assert_eq!(parse_uuid("00002a19").unwrap(), BATTERY_LEVEL);
   }

   #[test]
   fn full_uuids_in_any_notation() {
      let expected = Uuid::from_u128(0x74ec2172_0bad_4d01_8f77_997b2be0722a);
      assert_eq!(parse_uuid("74ec2172-0bad-4d01-8f77-997b2be0722a").unwrap(), expected);
      assert_eq!(parse_uuid("74EC21720BAD4D018F77997B2BE0722A").unwrap(), expected);
      assert_eq!(parse_uuid("{74ec2172-0bad-4d01-8f77-997b2be0722a}").unwrap(), expected);
   }

   #[test]
   fn garbage_uuid_is_rejected() {
      assert!(matches!(parse_uuid("not-a-uuid"), Err(AirPodsError::InvalidUuid(_))));
      assert!(matches!(parse_uuid("zzzz"), Err(AirPodsError::InvalidUuid(_))));
   }

   #[test]
   fn short_uuids_must_be_plain_hex() {
      assert!(matches!(parse_uuid("+a19"), Err(AirPodsError::InvalidUuid(_))));
      assert!(matches!(parse_uuid("+0002a19"), Err(AirPodsError::InvalidUuid(_))));
      assert_eq!(parse_uuid("0X2A19").unwrap(), BATTERY_LEVEL);
   }

   #[tokio::test(start_paused = true)]
   async fn stalled_read_times_out() {
      let res = with_timeout(
         Duration::from_millis(250),
         std::future::pending::<Result<Vec<u8>>>(),
      )
      .await;
      assert!(matches!(res, Err(AirPodsError::RequestTimeout)));
   }

   #[tokio::test(start_paused = true)]
   async fn completed_read_passes_through() {
      let res = with_timeout(Duration::from_millis(250), async { Ok(vec![0x02, 0x20]) }).await;
      assert_eq!(res.unwrap(), vec![0x02, 0x20]);

      let res: Result<Vec<u8>> =
         with_timeout(Duration::from_millis(250), async { Err(AirPodsError::DeviceNotConnected) })
            .await;
      assert!(matches!(res, Err(AirPodsError::DeviceNotConnected)));
   }

   #[test]
   fn blocking_read_reports_request_errors() {
      assert!(matches!(
         read_characteristic_blocking("  ", "180f", "2a19", DEFAULT_READ_TIMEOUT),
         Err(AirPodsError::InvalidDeviceId(_))
      ));
   }

   #[tokio::test]
   async fn blocking_read_refuses_to_nest_runtimes() {
      assert!(matches!(
         read_characteristic_blocking("AA:BB:CC:DD:EE:FF", "180f", "2a19", DEFAULT_READ_TIMEOUT),
         Err(AirPodsError::BlockingInRuntime)
      ));
   }

   #[test]
   fn request_leaves_empty_uuids_unset() {
      let req = CharacteristicRequest::new("/org/bluez/hci0/dev_AA/service0010/char0011", "", " ")
         .unwrap();
      assert_eq!(req.service, None);
      assert_eq!(req.characteristic, None);
      assert!(matches!(req.require_service(), Err(AirPodsError::MissingUuid("service"))));
      assert!(matches!(
         req.require_characteristic(),
         Err(AirPodsError::MissingUuid("characteristic"))
      ));
   }

   #[test]
   fn request_parses_uuids() {
      let req = CharacteristicRequest::new("AA:BB:CC:DD:EE:FF", "180f", "2a19").unwrap();
      assert_eq!(req.device, "AA:BB:CC:DD:EE:FF");
      assert_eq!(req.service, Some(uuid_from_u32(0x180f)));
      assert_eq!(req.require_characteristic().unwrap(), BATTERY_LEVEL);
   }

   #[test]
   fn empty_device_is_rejected() {
      assert!(matches!(
         CharacteristicRequest::new("  ", "180f", "2a19"),
         Err(AirPodsError::InvalidDeviceId(_))
      ));
   }
}
