//! WinRT backend for characteristic reads.
//!
//! The device is opened by WinRT device ID or Bluetooth address, then the
//! first service and characteristic matching the requested UUIDs are used
//! for a single `ReadValueAsync`.

use log::{debug, error};
use uuid::Uuid;
use windows::{
   Devices::Bluetooth::{
      BluetoothLEDevice,
      GenericAttributeProfile::{GattCharacteristic, GattCommunicationStatus, GattDeviceService},
   },
   Storage::Streams::{DataReader, IBuffer},
   core::{GUID, HSTRING},
};

use crate::{
   bluetooth::CharacteristicRequest,
   error::{AirPodsError, Result},
};

pub async fn read_characteristic(request: &CharacteristicRequest) -> Result<Vec<u8>> {
   let service_uuid = request.require_service()?;
   let char_uuid = request.require_characteristic()?;

   let device = open_device(&request.device).await?;
   let service = find_service(&device, service_uuid).await?;
   let characteristic = find_characteristic(&service, char_uuid).await?;

   let read = characteristic.ReadValueAsync()?.await?;
   let status = read.Status()?;
   if status != GattCommunicationStatus::Success {
      error!("Read of {char_uuid} failed with status {status:?}");
      return Err(AirPodsError::ReadFailed(format!("{status:?}").into()));
   }
   buffer_to_vec(&read.Value()?)
}

async fn open_device(device_id: &str) -> Result<BluetoothLEDevice> {
   if let Some(address) = parse_address(device_id) {
      debug!("Opening device by address {address:#014X}");
      let op = BluetoothLEDevice::FromBluetoothAddressAsync(address)?;
      return op.await.map_err(|e| device_not_found(device_id, e));
   }
   debug!("Opening device {device_id}");
   let op = BluetoothLEDevice::FromIdAsync(&HSTRING::from(device_id))?;
   op.await.map_err(|e| device_not_found(device_id, e))
}

/// WinRT completes the open with a null device when nothing matches the ID,
/// which surfaces as an error on the await.
fn device_not_found(device_id: &str, e: windows::core::Error) -> AirPodsError {
   debug!("No device for {device_id}: {e}");
   AirPodsError::DeviceNotFound(device_id.into())
}

/// Parses `AA:BB:CC:DD:EE:FF` into the 48-bit integer form WinRT uses.
pub fn parse_address(s: &str) -> Option<u64> {
   let parts: Vec<&str> = s.split(':').collect();
   if parts.len() != 6 || parts.iter().any(|p| p.len() != 2) {
      return None;
   }
   parts
      .iter()
      .try_fold(0u64, |acc, p| Some((acc << 8) | u64::from(u8::from_str_radix(p, 16).ok()?)))
}

pub const fn to_guid(uuid: Uuid) -> GUID {
   GUID::from_u128(uuid.as_u128())
}

async fn find_service(device: &BluetoothLEDevice, uuid: Uuid) -> Result<GattDeviceService> {
   let result = device.GetGattServicesForUuidAsync(to_guid(uuid))?.await?;
   if result.Status()? != GattCommunicationStatus::Success {
      error!("Failed to get GATT services. Status: {:?}", result.Status()?);
      return Err(AirPodsError::ServiceNotFound(uuid));
   }
   let services = result.Services()?;
   if services.Size()? == 0 {
      return Err(AirPodsError::ServiceNotFound(uuid));
   }
   Ok(services.GetAt(0)?)
}

async fn find_characteristic(service: &GattDeviceService, uuid: Uuid) -> Result<GattCharacteristic> {
   let result = service.GetCharacteristicsForUuidAsync(to_guid(uuid))?.await?;
   if result.Status()? != GattCommunicationStatus::Success {
      error!("Failed to get characteristics. Status: {:?}", result.Status()?);
      return Err(AirPodsError::CharacteristicNotFound(uuid));
   }
   let characteristics = result.Characteristics()?;
   if characteristics.Size()? == 0 {
      return Err(AirPodsError::CharacteristicNotFound(uuid));
   }
   Ok(characteristics.GetAt(0)?)
}

fn buffer_to_vec(buffer: &IBuffer) -> Result<Vec<u8>> {
   let reader = DataReader::FromBuffer(buffer)?;
   let mut bytes = vec![0u8; reader.UnconsumedBufferLength()? as usize];
   reader.ReadBytes(&mut bytes)?;
   Ok(bytes)
}

#[cfg(test)]
mod tests {
   use windows::core::HRESULT;

   use super::*;

   #[test]
   fn null_device_is_reported_as_not_found() {
      let id = "BluetoothLE#BluetoothLE00:11:22:33:44:55-aa:bb:cc:dd:ee:ff";
      let e = windows::core::Error::from_hresult(HRESULT(0x8000_4003_u32 as i32));
      assert!(matches!(
         device_not_found(id, e),
         AirPodsError::DeviceNotFound(ref d) if d == id
      ));
   }

   #[test]
   fn colon_addresses_parse_to_u64() {
      assert_eq!(parse_address("AA:BB:CC:DD:EE:FF"), Some(0xAABB_CCDD_EEFF));
      assert_eq!(parse_address("00:1a:7d:da:71:13"), Some(0x001A_7DDA_7113));
   }

   #[test]
   fn device_ids_are_not_addresses() {
      assert_eq!(
         parse_address("BluetoothLE#BluetoothLE00:11:22:33:44:55-aa:bb:cc:dd:ee:ff"),
         None
      );
      assert_eq!(parse_address("AA:BB:CC:DD:EE"), None);
      assert_eq!(parse_address("AA:BB:CC:DD:EE:GG"), None);
   }

   #[test]
   fn uuid_maps_to_guid_fields() {
      let guid = to_guid(Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb));
      assert_eq!(guid.data1, 0x0000180f);
      assert_eq!(guid.data2, 0x0000);
      assert_eq!(guid.data3, 0x1000);
      assert_eq!(guid.data4, [0x80, 0x00, 0x00, 0x80, 0x5f, 0x9b, 0x34, 0xfb]);
   }
}
