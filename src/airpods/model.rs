//! `AirPods` model identifiers and their display names.
//!
//! A model is identified by a 2-byte code carried little-endian in vendor
//! payloads. Unrecognized codes are rendered with a hex fallback name.

use serde_json::json;
use smol_str::{SmolStr, format_smolstr};

/// Name used when a payload is too short to carry a model ID.
pub const UNKNOWN_MODEL_NAME: &str = "AirPods (Unknown model)";

/// Number of bytes occupied by a model ID.
pub const MODEL_ID_LEN: usize = 2;

/// Known `AirPods` hardware variants, keyed by model ID.
#[repr(u16)]
#[derive(
   Debug,
   Clone,
   Copy,
   PartialEq,
   Eq,
   Hash,
   strum::FromRepr,
   strum::Display,
   strum::EnumIter,
   strum::IntoStaticStr,
)]
pub enum Model {
   #[strum(serialize = "AirPods (1st gen)")]
   AirPods1 = 0x2002,
   #[strum(serialize = "AirPods (2nd gen)")]
   AirPods2 = 0x2008,
   #[strum(serialize = "AirPods (3rd gen)")]
   AirPods3 = 0x2015,
   #[strum(serialize = "AirPods 4")]
   AirPods4 = 0x2019,
   #[strum(serialize = "AirPods 4 (ANC)")]
   AirPods4Anc = 0x201B,
   #[strum(serialize = "AirPods Pro")]
   AirPodsPro = 0x2101,
   #[strum(serialize = "AirPods Pro (2nd gen)")]
   AirPodsPro2 = 0x2201,
   #[strum(serialize = "AirPods Max")]
   AirPodsMax = 0x2301,
}

impl Model {
   pub fn from_id(id: u16) -> Option<Self> {
      Self::from_repr(id)
   }

   pub const fn id(self) -> u16 {
      self as u16
   }

   pub fn name(self) -> &'static str {
      self.into()
   }
}

/// Formats the display name for a model ID that has no table entry.
pub fn fallback_name(raw_id: u16) -> SmolStr {
   format_smolstr!("AirPods (0x{raw_id:04X})")
}

/// Returns the display name for a model ID, falling back to its hex form.
pub fn model_name(raw_id: u16) -> SmolStr {
   match Model::from_id(raw_id) {
      Some(model) => SmolStr::new_static(model.name()),
      None => fallback_name(raw_id),
   }
}

/// Extracts the little-endian model ID from the first two bytes of a payload.
pub fn model_id_from_payload(payload: &[u8]) -> Option<u16> {
   let (id, _) = payload.split_first_chunk::<MODEL_ID_LEN>()?;
   Some(u16::from_le_bytes(*id))
}

/// Describes the accessory a payload belongs to.
pub fn describe_payload(payload: &[u8]) -> SmolStr {
   model_id_from_payload(payload).map_or_else(|| SmolStr::new_static(UNKNOWN_MODEL_NAME), model_name)
}

/// A decoded model ID together with its display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
   pub id: u16,
   pub model: Option<Model>,
   pub name: SmolStr,
}

impl ModelInfo {
   pub fn from_id(id: u16) -> Self {
      Self {
         id,
         model: Model::from_id(id),
         name: model_name(id),
      }
   }

   pub fn from_payload(payload: &[u8]) -> Option<Self> {
      model_id_from_payload(payload).map(Self::from_id)
   }

   pub const fn is_known(&self) -> bool {
      self.model.is_some()
   }

   pub fn to_json(&self) -> serde_json::Value {
      json!({
          "id": format!("0x{:04X}", self.id),
          "name": self.name.as_str(),
          "known": self.is_known(),
      })
   }
}
