use clap::Args;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use super::{open_station, CliResult};

#[derive(Args)]
pub struct RunArgs {
    /// Leave the recurring timers stopped (closing and hourly still run)
    #[arg(long)]
    pub paused: bool,
    /// Print every station event to stdout as a JSON line
    #[arg(long)]
    pub events: bool,
}

pub async fn run(args: RunArgs) -> CliResult {
    let mut station = open_station()?;

    if args.events {
        let mut events = station.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(line) => println!("{line}"),
                        Err(e) => warn!(error = %e, "could not serialize event"),
                    },
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "event printer lagged"),
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    if !args.paused {
        station.start_timers();
    }

    station
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "could not listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    station.stop_timers();
    Ok(())
}
