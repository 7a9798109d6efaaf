//! Advertisement scanning for `AirPods` on BlueZ.
//!
//! Runs a discovery session on one adapter and reports each recognized
//! device once, together with the model decoded from its advertisement.

use std::{collections::HashSet, time::Duration};

use bluer::{Adapter, AdapterEvent, Address, Session};
use futures::{StreamExt, pin_mut};
use log::{debug, info, warn};
use smol_str::SmolStr;
use tokio::time;

use crate::{
   airpods::recognition::{self, Identification},
   config::Config,
   error::Result,
};

/// A recognized device seen during a scan.
#[derive(Debug, Clone)]
pub struct ScanResult {
   pub address: Address,
   pub identification: Identification,
   pub rssi: Option<i16>,
   pub known_name: Option<SmolStr>,
}

impl ScanResult {
   pub fn to_json(&self) -> serde_json::Value {
      serde_json::json!({
          "address": self.address.to_string(),
          "model_id": self.identification.model_id().map(|id| format!("0x{id:04X}")),
          "name": self.identification.display_name().as_str(),
          "rssi": self.rssi,
          "known_name": self.known_name.as_deref(),
      })
   }
}

async fn open_adapter(session: &Session, name: Option<&str>) -> Result<Adapter> {
   let adapter = match name {
      Some(name) => session.adapter(name)?,
      None => session.default_adapter().await?,
   };

   if !adapter.is_powered().await? {
      adapter.set_powered(true).await?;
      info!("Powered on adapter: {}", adapter.name());
   }
   Ok(adapter)
}

/// Scans for `AirPods` advertisements for `duration`, calling `on_found`
/// the first time each device is recognized.
pub async fn scan<F>(config: &Config, duration: Duration, mut on_found: F) -> Result<Vec<ScanResult>>
where
   F: FnMut(&ScanResult),
{
   let session = Session::new().await?;
   let adapter = open_adapter(&session, config.adapter.as_deref()).await?;
   info!("Scanning on {} for {duration:?}", adapter.name());

   let events = adapter.discover_devices().await?;
   pin_mut!(events);

   let mut seen = HashSet::new();
   let mut found = Vec::new();
   let deadline = time::sleep(duration);
   tokio::pin!(deadline);

   loop {
      tokio::select! {
         () = &mut deadline => break,
         event = events.next() => {
            let Some(event) = event else {
               warn!("Discovery stream ended early");
               break;
            };
            let AdapterEvent::DeviceAdded(addr) = event else {
               continue;
            };
            if seen.contains(&addr) {
               continue;
            }
            let Some(result) = inspect(&adapter, addr, config).await else {
               continue;
            };
            seen.insert(addr);
            on_found(&result);
            found.push(result);
         },
      }
   }

   info!("Scan finished, {} device(s) recognized", found.len());
   Ok(found)
}

async fn inspect(adapter: &Adapter, addr: Address, config: &Config) -> Option<ScanResult> {
   let device = match adapter.device(addr) {
      Ok(device) => device,
      Err(e) => {
         debug!("Cannot open {addr}: {e}");
         return None;
      },
   };
   let identification = recognition::identify_device(&device).await?;
   let rssi = device.rssi().await.ok().flatten();
   Some(ScanResult {
      address: addr,
      identification,
      rssi,
      known_name: config.is_known_device(&addr.to_string()).map(SmolStr::from),
   })
}
