use clap::Subcommand;

use announcer_core::HourlyChime;

use super::{drain, open_station, open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum HourlyAction {
    /// Show whether the hourly chime is on
    Status,
    /// Turn the hourly chime on
    On,
    /// Turn the hourly chime off
    Off,
    /// Speak the current time now
    Test,
}

pub async fn run(action: HourlyAction) -> CliResult {
    match action {
        HourlyAction::Status => {
            let chime = HourlyChime::load(open_store()?);
            print_json(&serde_json::json!({ "enabled": chime.is_enabled() }))
        }
        HourlyAction::On | HourlyAction::Off => {
            let enabled = matches!(action, HourlyAction::On);
            let mut chime = HourlyChime::load(open_store()?);
            chime.set_enabled(enabled);
            print_json(&serde_json::json!({ "enabled": chime.is_enabled() }))
        }
        HourlyAction::Test => {
            let mut station = open_station()?;
            let announcement = station.test_hourly();
            drain(&mut station).await;
            print_json(&announcement)
        }
    }
}
