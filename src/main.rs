//! `airpods-probe` command line tool.
//!
//! Decodes `AirPods` model IDs, reads GATT characteristics through the
//! native Bluetooth stack and scans for `AirPods` advertisements.

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use log::info;
use serde_json::json;
use strum::IntoEnumIterator;

use airpods_probe::{
   airpods::{Model, ModelInfo, UNKNOWN_MODEL_NAME},
   bluetooth::{self, CharacteristicRequest},
   config::Config,
   error::Result,
};

#[derive(Parser, Debug)]
#[command(name = "airpods-probe", version, about = "AirPods model and GATT probe")]
struct Cli {
   /// Configuration file (defaults to $XDG_CONFIG_HOME/airpods-probe/config.toml)
   #[arg(long, global = true)]
   config: Option<PathBuf>,

   /// Print machine-readable JSON
   #[arg(long, global = true)]
   json: bool,

   #[command(subcommand)]
   command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
   /// Decode the model ID at the start of a hex payload
   Model { payload: String },

   /// List known models
   Models,

   /// Read a characteristic value
   Read {
      /// BlueZ characteristic object path, device address, WinRT device ID or known device name
      device: String,
      /// Service UUID (may be empty for BlueZ object paths)
      service: String,
      /// Characteristic UUID (may be empty for BlueZ object paths)
      characteristic: String,
      #[arg(long)]
      timeout_ms: Option<u64>,
      /// Adapter to resolve addresses on, e.g. hci0
      #[arg(long)]
      adapter: Option<String>,
      /// Also decode the value as a model payload
      #[arg(long)]
      decode: bool,
   },

   /// Scan for AirPods advertisements
   Scan {
      /// Scan duration in seconds
      #[arg(long)]
      duration: Option<u64>,
   },
}

/// Accepts `0x2002`, `02 20`, `02:20` and plain hex.
fn parse_hex_payload(s: &str) -> Result<Vec<u8>> {
   let s = s.trim();
   let s = s.strip_prefix("0x").unwrap_or(s);
   let cleaned: String = s
      .chars()
      .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
      .collect();
   Ok(hex::decode(cleaned)?)
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
   match path {
      Some(path) => Config::load_from(path),
      None => Config::load(),
   }
}

fn print_model(payload: &[u8], as_json: bool) {
   match ModelInfo::from_payload(payload) {
      Some(info) if as_json => println!("{}", info.to_json()),
      Some(info) => println!("{}", info.name),
      None if as_json => println!("{}", json!({ "id": null, "name": UNKNOWN_MODEL_NAME, "known": false })),
      None => println!("{UNKNOWN_MODEL_NAME}"),
   }
}

#[tokio::main]
async fn main() -> Result<()> {
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

   let cli = Cli::parse();

   match cli.command {
      Command::Model { payload } => {
         let bytes = parse_hex_payload(&payload)?;
         print_model(&bytes, cli.json);
      },

      Command::Models => {
         for model in Model::iter() {
            if cli.json {
               println!("{}", ModelInfo::from_id(model.id()).to_json());
            } else {
               println!("0x{:04X}  {model}", model.id());
            }
         }
      },

      Command::Read {
         device,
         service,
         characteristic,
         timeout_ms,
         adapter,
         decode,
      } => {
         let config = load_config(cli.config.as_ref())?;
         let device = config.resolve_device(&device);
         let request = CharacteristicRequest::new(device, &service, &characteristic)?
            .on_adapter(adapter.as_deref().or(config.adapter.as_deref()));
         let timeout = timeout_ms.map_or_else(|| config.read_timeout(), Duration::from_millis);

         let value = bluetooth::read(&request, timeout).await?;
         if cli.json {
            let mut out = json!({
                "device": request.device.as_str(),
                "value": hex::encode(&value),
            });
            if decode {
               out["model"] = ModelInfo::from_payload(&value)
                  .map_or_else(|| json!(null), |info| info.to_json());
            }
            println!("{out}");
         } else {
            println!("{}", hex::encode(&value));
            if decode {
               print_model(&value, false);
            }
         }
      },

      Command::Scan { duration } => {
         let config = load_config(cli.config.as_ref())?;
         let duration = duration.map_or_else(|| config.scan_duration(), Duration::from_secs);
         run_scan(&config, duration, cli.json).await?;
      },
   }

   Ok(())
}

#[cfg(target_os = "linux")]
async fn run_scan(config: &Config, duration: Duration, as_json: bool) -> Result<()> {
   let found = bluetooth::scan::scan(config, duration, |result| {
      if as_json {
         println!("{}", result.to_json());
      } else {
         let rssi = result
            .rssi
            .map_or_else(|| "n/a".to_owned(), |r| format!("{r} dBm"));
         match &result.known_name {
            Some(known) => println!(
               "{}  {}  ({known}, {rssi})",
               result.address,
               result.identification.display_name()
            ),
            None => println!(
               "{}  {}  ({rssi})",
               result.address,
               result.identification.display_name()
            ),
         }
      }
   })
   .await?;
   info!("{} AirPods device(s) found", found.len());
   Ok(())
}

#[cfg(not(target_os = "linux"))]
async fn run_scan(_config: &Config, _duration: Duration, _as_json: bool) -> Result<()> {
   info!("Advertisement scanning is only available with BlueZ");
   Err(airpods_probe::AirPodsError::UnsupportedPlatform)
}
