//! Device recognition logic for `AirPods` devices.
//!
//! This module extracts model IDs from Apple advertisement data and, on
//! Linux, identifies BlueZ devices based on modalias, manufacturer data,
//! advertised Apple services and name/alias patterns.

use std::collections::HashMap;

use smol_str::SmolStr;
use uuid::Uuid;

use crate::airpods::model::{self, MODEL_ID_LEN};

/// Apple company ID for manufacturer data
pub const APPLE_CID: u16 = 0x004C;

/// Proximity-pairing message type in manufacturer data
pub const PP_TYPE: u8 = 0x07;

/// Offset of the model ID inside the proximity-pairing TLV
const MODEL_ID_OFFSET: usize = 3;

/// Service UUIDs only Apple accessories advertise
pub static APPLE_SERVICES: [Uuid; 3] = [
   Uuid::from_u128(0x0000fd6f_0000_1000_8000_00805f9b34fb), // Find My
   Uuid::from_u128(0x0000fd39_0000_1000_8000_00805f9b34fb), // Apple service
   Uuid::from_u128(0x0000fd32_0000_1000_8000_00805f9b34fb), // Apple service
];

/// Apple vendor ID as reported in the modalias
#[cfg(target_os = "linux")]
const APPLE_VID: u32 = 0x004C;

/// Patterns to match `AirPods` devices (case-insensitive)
#[cfg(target_os = "linux")]
const AIRPOD_PATTERNS: &[&str] = &["airpods", "beats", "powerbeats"];

/// Extracts the model ID from Apple manufacturer data.
///
/// Proximity-pairing TLV: `[0] type, [1] len, [2] prefix, [3..5] model (LE), ...`
pub fn model_id_from_manufacturer_data(data: &[u8]) -> Option<u16> {
   if data.first() != Some(&PP_TYPE) {
      return None;
   }
   model::model_id_from_payload(data.get(MODEL_ID_OFFSET..MODEL_ID_OFFSET + MODEL_ID_LEN)?)
}

/// Extracts the model ID from the manufacturer data map of an advertisement.
pub fn model_id_from_advertisement(mfg_data: &HashMap<u16, Vec<u8>>) -> Option<u16> {
   mfg_data
      .get(&APPLE_CID)
      .and_then(|data| model_id_from_manufacturer_data(data))
}

/// Returns the first advertised service UUID that belongs to Apple.
pub fn apple_service_in<'a>(uuids: impl IntoIterator<Item = &'a Uuid>) -> Option<Uuid> {
   uuids.into_iter().find(|u| APPLE_SERVICES.contains(u)).copied()
}

/// How a device was recognized as an `AirPods` accessory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identification {
   /// A model ID was found in the modalias or advertisement.
   Model(u16),
   /// An Apple service UUID was advertised, but no model ID.
   AppleService(Uuid),
   /// Only the name or alias matched.
   NamePattern(SmolStr),
}

impl Identification {
   pub fn model_id(&self) -> Option<u16> {
      match self {
         Self::Model(id) => Some(*id),
         Self::AppleService(_) | Self::NamePattern(_) => None,
      }
   }

   pub fn display_name(&self) -> SmolStr {
      match self {
         Self::Model(id) => model::model_name(*id),
         Self::AppleService(_) => SmolStr::new_static(model::UNKNOWN_MODEL_NAME),
         Self::NamePattern(name) => name.clone(),
      }
   }
}

#[cfg(target_os = "linux")]
fn matches_pattern(text: &str) -> Option<&'static str> {
   let lower = text.to_ascii_lowercase();
   AIRPOD_PATTERNS.iter().copied().find(|p| lower.contains(p))
}

#[cfg(target_os = "linux")]
pub async fn identify_device(dev: &bluer::Device) -> Option<Identification> {
   // 1. Check modalias (most reliable for connected devices)
   if let Ok(Some(modalias)) = dev.modalias().await
      && modalias.vendor == APPLE_VID
      && let Ok(product) = u16::try_from(modalias.product)
      && model::Model::from_id(product).is_some()
   {
      log::debug!(
         "AirPods detected via modalias: vendor={:#06x}, product={:#06x}",
         modalias.vendor,
         modalias.product
      );
      return Some(Identification::Model(product));
   }

   // 2. Check manufacturer data (useful for advertising/unconnected devices)
   if let Ok(Some(mfg_data)) = dev.manufacturer_data().await
      && let Some(id) = model_id_from_advertisement(&mfg_data)
   {
      log::debug!("AirPods detected via manufacturer data: {id:#06x}");
      return Some(Identification::Model(id));
   }

   // 3. Check advertised Apple services
   if let Ok(Some(uuids)) = dev.uuids().await
      && let Some(uuid) = apple_service_in(&uuids)
   {
      log::debug!("AirPods detected via Apple service UUID {uuid}");
      return Some(Identification::AppleService(uuid));
   }

   // 4. Last-chance name/alias pattern matching
   if let Ok(Some(name)) = dev.name().await
      && let Some(pattern) = matches_pattern(&name)
   {
      log::debug!("AirPods detected via name pattern: {name} => {pattern}");
      return Some(Identification::NamePattern(name.into()));
   }
   if let Ok(alias) = dev.alias().await
      && let Some(pattern) = matches_pattern(&alias)
   {
      log::debug!("AirPods detected via alias pattern: {alias} => {pattern}");
      return Some(Identification::NamePattern(alias.into()));
   }
   None
}

#[cfg(test)]
mod tests {
   use super::*;

   // AirPods Pro (2nd gen) proximity-pairing advertisement
   const PRO2_ADV: &[u8] = &[
      0x07, 0x19, 0x01, 0x01, 0x22, 0x2b, 0x55, 0x8f, 0x01, 0x00, 0x04, 0x00, 0x00,
   ];

   #[test]
   fn proximity_pairing_yields_model_id() {
      assert_eq!(model_id_from_manufacturer_data(PRO2_ADV), Some(0x2201));
   }

   #[test]
   fn other_message_types_are_ignored() {
      let mut data = PRO2_ADV.to_vec();
      data[0] = 0x10;
      assert_eq!(model_id_from_manufacturer_data(&data), None);
   }

   #[test]
   fn truncated_tlv_yields_nothing() {
      assert_eq!(model_id_from_manufacturer_data(&[]), None);
      assert_eq!(model_id_from_manufacturer_data(&[0x07, 0x19, 0x01, 0x02]), None);
      assert_eq!(
         model_id_from_manufacturer_data(&[0x07, 0x19, 0x01, 0x02, 0x20]),
         Some(0x2002)
      );
   }

   #[test]
   fn advertisement_requires_apple_company_id() {
      let mut mfg = HashMap::new();
      mfg.insert(0x0006, PRO2_ADV.to_vec());
      assert_eq!(model_id_from_advertisement(&mfg), None);

      mfg.insert(APPLE_CID, PRO2_ADV.to_vec());
      assert_eq!(model_id_from_advertisement(&mfg), Some(0x2201));
   }

   #[test]
   fn identification_names() {
      assert_eq!(Identification::Model(0x2301).display_name(), "AirPods Max");
      assert_eq!(Identification::Model(0x2301).model_id(), Some(0x2301));

      let by_name = Identification::NamePattern("Kim's Beats".into());
      assert_eq!(by_name.model_id(), None);
      assert_eq!(by_name.display_name(), "Kim's Beats");

      let by_service = Identification::AppleService(APPLE_SERVICES[0]);
      assert_eq!(by_service.model_id(), None);
      assert_eq!(by_service.display_name(), model::UNKNOWN_MODEL_NAME);
   }

   #[test]
   fn apple_services_are_picked_out() {
      let battery = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);
      let find_my = Uuid::from_u128(0x0000fd6f_0000_1000_8000_00805f9b34fb);
      assert_eq!(apple_service_in(&[battery, find_my]), Some(find_my));
      assert_eq!(apple_service_in(&[battery]), None);
      assert_eq!(apple_service_in(&[] as &[Uuid]), None);
   }

   #[cfg(target_os = "linux")]
   #[test]
   fn name_patterns_are_case_insensitive() {
      assert_eq!(matches_pattern("My AIRPODS Pro"), Some("airpods"));
      assert_eq!(matches_pattern("Powerbeats Pro"), Some("beats"));
      assert_eq!(matches_pattern("Pixel Buds"), None);
   }
}
