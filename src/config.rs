//! Configuration management for `airpods-probe`.
//!
//! This module handles loading and saving configuration from disk,
//! including known devices, the adapter to use and read/scan timings.

use std::{
   env, fs,
   path::{Path, PathBuf},
   time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
   bluetooth::DEFAULT_READ_TIMEOUT,
   error::{AirPodsError, Result},
};

/// Main configuration structure.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
   #[serde(default)]
   pub known_devices: Vec<KnownDevice>,

   /// Adapter name such as `hci0`; the default adapter is used when unset.
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub adapter: Option<String>,

   #[serde(default = "default_read_timeout")]
   pub read_timeout_ms: u64,

   #[serde(default = "default_scan_duration")]
   pub scan_duration_sec: u64,
}

/// A device the user has given a friendly name.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct KnownDevice {
   pub address: String,
   pub name: String,
}

const fn default_read_timeout() -> u64 {
   DEFAULT_READ_TIMEOUT.as_millis() as u64
}

const fn default_scan_duration() -> u64 {
   10
}

impl Default for Config {
   fn default() -> Self {
      Self {
         known_devices: vec![],
         adapter: None,
         read_timeout_ms: default_read_timeout(),
         scan_duration_sec: default_scan_duration(),
      }
   }
}

impl Config {
   /// Loads configuration from the default location, creating it if it does not exist.
   pub fn load() -> Result<Self> {
      let config_path = Self::config_path()?;

      if config_path.exists() {
         Self::load_from(&config_path)
      } else {
         let config = Self::default();
         config.save_to(&config_path)?;
         Ok(config)
      }
   }

   /// Loads configuration from an explicit path.
   pub fn load_from(path: &Path) -> Result<Self> {
      let contents = fs::read_to_string(path)?;
      Ok(toml::from_str(&contents)?)
   }

   pub fn save_to(&self, path: &Path) -> Result<()> {
      if let Some(parent) = path.parent() {
         fs::create_dir_all(parent)?;
      }

      let contents = toml::to_string_pretty(self)?;
      fs::write(path, contents)?;

      Ok(())
   }

   fn config_path() -> Result<PathBuf> {
      let config_dir = if let Ok(airpods_home) = env::var("AIRPODS_HOME") {
         PathBuf::from(airpods_home)
      } else if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
         PathBuf::from(config_home)
      } else if let Ok(home) = env::var("HOME") {
         PathBuf::from(home).join(".config")
      } else {
         dirs::config_dir().ok_or(AirPodsError::ConfigDirNotFound)?
      };

      Ok(config_dir.join("airpods-probe").join("config.toml"))
   }

   pub const fn read_timeout(&self) -> Duration {
      Duration::from_millis(self.read_timeout_ms)
   }

   pub const fn scan_duration(&self) -> Duration {
      Duration::from_secs(self.scan_duration_sec)
   }

   /// Checks if the given address is a known device and returns its name.
   pub fn is_known_device(&self, address: &str) -> Option<&str> {
      self
         .known_devices
         .iter()
         .find(|d| d.address.eq_ignore_ascii_case(address))
         .map(|d| d.name.as_str())
   }

   /// Maps a friendly name to its address; anything else is returned unchanged.
   pub fn resolve_device<'a>(&'a self, name_or_id: &'a str) -> &'a str {
      self
         .known_devices
         .iter()
         .find(|d| d.name == name_or_id)
         .map_or(name_or_id, |d| d.address.as_str())
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn sample() -> Config {
      Config {
         known_devices: vec![KnownDevice {
            address: "AA:BB:CC:DD:EE:FF".into(),
            name: "Desk Pods".into(),
         }],
         ..Config::default()
      }
   }

   #[test]
   fn missing_fields_take_defaults() {
      let config: Config = toml::from_str("").unwrap();
      assert_eq!(config, Config::default());
      assert_eq!(config.read_timeout(), Duration::from_millis(5000));
      assert_eq!(config.scan_duration(), Duration::from_secs(10));
      assert!(config.adapter.is_none());
   }

   #[test]
   fn save_and_load_from_path() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("nested").join("config.toml");

      let mut config = sample();
      config.adapter = Some("hci1".into());
      config.read_timeout_ms = 1500;
      config.save_to(&path).unwrap();

      let loaded = Config::load_from(&path).unwrap();
      assert_eq!(loaded, config);
   }

   #[test]
   fn malformed_file_is_rejected() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("config.toml");
      fs::write(&path, "read_timeout_ms = \"soon\"").unwrap();

      assert!(matches!(
         Config::load_from(&path),
         Err(AirPodsError::TomlParse(_))
      ));
   }

   #[test]
   fn known_device_lookup_ignores_address_case() {
      let config = sample();
      assert_eq!(config.is_known_device("aa:bb:cc:dd:ee:ff"), Some("Desk Pods"));
      assert_eq!(config.is_known_device("11:22:33:44:55:66"), None);
   }

   #[test]
   fn resolve_device_maps_friendly_names() {
      let config = sample();
      assert_eq!(config.resolve_device("Desk Pods"), "AA:BB:CC:DD:EE:FF");
      assert_eq!(
         config.resolve_device("/org/bluez/hci0/dev_AA/service0010/char0011"),
         "/org/bluez/hci0/dev_AA/service0010/char0011"
      );
   }
}
