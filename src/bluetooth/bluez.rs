//! BlueZ backend for characteristic reads.
//!
//! A characteristic is addressed either directly by its D-Bus object path,
//! in which case `org.bluez.GattCharacteristic1.ReadValue` is called on the
//! system bus, or by device address plus service and characteristic UUIDs,
//! which are resolved through bluer.

use std::{collections::HashMap, str::FromStr};

use bluer::{
   Address, Session,
   gatt::remote::{Characteristic, Service},
};
use log::{debug, warn};
use uuid::Uuid;
use zbus::{Connection, proxy, zvariant};

use crate::{
   bluetooth::CharacteristicRequest,
   error::{AirPodsError, Result},
};

#[proxy(
   interface = "org.bluez.GattCharacteristic1",
   default_service = "org.bluez",
   gen_blocking = false
)]
trait GattCharacteristic1 {
   fn read_value(&self, options: HashMap<&str, zvariant::Value<'_>>) -> zbus::Result<Vec<u8>>;

   #[zbus(property, name = "UUID")]
   fn uuid(&self) -> zbus::Result<String>;
}

/// How the device identifier of a request is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
   ObjectPath(&'a str),
   Address(Address),
}

impl<'a> Target<'a> {
   pub fn parse(device_id: &'a str) -> Result<Self> {
      if device_id.starts_with('/') {
         return Ok(Self::ObjectPath(device_id));
      }
      Address::from_str(device_id)
         .map(Self::Address)
         .map_err(|_| AirPodsError::InvalidDeviceId(device_id.into()))
   }
}

pub async fn read_characteristic(request: &CharacteristicRequest) -> Result<Vec<u8>> {
   match Target::parse(&request.device)? {
      Target::ObjectPath(path) => read_object_path(path, request.characteristic).await,
      Target::Address(addr) => read_by_uuid(addr, request).await,
   }
}

/// Calls `ReadValue` with empty options on a characteristic object.
pub async fn read_object_path(path: &str, expected: Option<Uuid>) -> Result<Vec<u8>> {
   let conn = Connection::system().await?;
   let proxy = GattCharacteristic1Proxy::builder(&conn)
      .path(path)?
      .build()
      .await?;

   if let Some(expected) = expected {
      let actual = proxy.uuid().await?;
      if !uuid_matches(expected, &actual) {
         return Err(AirPodsError::CharacteristicMismatch {
            expected,
            actual: actual.into(),
         });
      }
   }

   debug!("ReadValue on {path}");
   Ok(proxy.read_value(HashMap::new()).await?)
}

fn uuid_matches(expected: Uuid, actual: &str) -> bool {
   Uuid::parse_str(actual).is_ok_and(|u| u == expected)
}

async fn read_by_uuid(addr: Address, request: &CharacteristicRequest) -> Result<Vec<u8>> {
   let service_uuid = request.require_service()?;
   let char_uuid = request.require_characteristic()?;

   let session = Session::new().await?;
   let adapter = match &request.adapter {
      Some(name) => session.adapter(name)?,
      None => session.default_adapter().await?,
   };
   let device = adapter.device(addr)?;

   if !device.is_connected().await? {
      warn!("{addr} is not connected; characteristic reads need an existing connection");
      return Err(AirPodsError::DeviceNotConnected);
   }

   let service = find_service(&device, service_uuid).await?;
   let characteristic = find_characteristic(&service, char_uuid).await?;
   debug!("Reading {char_uuid} from service {service_uuid} on {addr}");
   Ok(characteristic.read().await?)
}

async fn find_service(device: &bluer::Device, uuid: Uuid) -> Result<Service> {
   for service in device.services().await? {
      if service.uuid().await? == uuid {
         return Ok(service);
      }
   }
   Err(AirPodsError::ServiceNotFound(uuid))
}

async fn find_characteristic(service: &Service, uuid: Uuid) -> Result<Characteristic> {
   for characteristic in service.characteristics().await? {
      if characteristic.uuid().await? == uuid {
         return Ok(characteristic);
      }
   }
   Err(AirPodsError::CharacteristicNotFound(uuid))
}
