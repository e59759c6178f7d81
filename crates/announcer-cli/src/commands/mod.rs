pub mod closing;
pub mod config;
pub mod hourly;
pub mod run;
pub mod say;
pub mod timer;
pub mod voice;

use std::error::Error;
use std::sync::Arc;

use announcer_core::storage::{credentials, Config, Database, KvStore};
use announcer_core::{SharedVolume, SpeechBackends, Station, SystemClock};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn Error>>;

pub fn open_store() -> Result<Arc<dyn KvStore>, Box<dyn Error>> {
    Ok(Arc::new(Database::open()?))
}

/// A station wired to the real clock, the configured backends and a
/// detached media volume.
pub fn open_station() -> Result<Station, Box<dyn Error>> {
    let config = Config::load()?;
    let backends = SpeechBackends::from_config(&config, credentials::api_key())?;
    let station = Station::open(
        &config,
        open_store()?,
        Arc::new(SystemClock),
        backends,
        Arc::new(SharedVolume::new()),
    )?;
    Ok(station)
}

/// Block until everything queued on `station` has been spoken.
pub async fn drain(station: &mut Station) {
    station.speech().wait_idle().await;
    // Idle already; this only restores media volume.
    station.stop_speech();
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
