use clap::Subcommand;
use serde::Serialize;

use announcer_core::closing::ClosingAnnouncement;

use super::{drain, open_station, print_json, CliResult};

#[derive(Subcommand)]
pub enum ClosingAction {
    /// List the closing schedule with the spoken messages
    List,
    /// Speak a closing announcement now
    Trigger {
        /// Announcement id (e.g. closing-15)
        id: String,
    },
    /// Show the next closing announcement due today
    Next,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduledClosing<'a> {
    #[serde(flatten)]
    announcement: &'a ClosingAnnouncement,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NextClosing<'a> {
    closing_time: &'a str,
    next: Option<ScheduledClosing<'a>>,
    countdown: Option<String>,
}

pub async fn run(action: ClosingAction) -> CliResult {
    let mut station = open_station()?;

    match action {
        ClosingAction::List => {
            let closing = station.closing();
            let entries: Vec<_> = closing
                .schedule()
                .iter()
                .map(|(announcement, _)| ScheduledClosing {
                    announcement,
                    message: closing.message_for(announcement),
                })
                .collect();
            print_json(&entries)
        }
        ClosingAction::Trigger { id } => {
            let announcement = station
                .trigger_closing(&id)
                .ok_or_else(|| format!("unknown closing announcement: {id}"))?;
            drain(&mut station).await;
            print_json(&announcement)
        }
        ClosingAction::Next => {
            let now = station.now();
            let closing = station.closing();
            let next = closing.next_announcement(now).map(|announcement| ScheduledClosing {
                announcement,
                message: closing.message_for(announcement),
            });
            print_json(&NextClosing {
                closing_time: closing.closing_time(),
                next,
                countdown: closing.time_until_next(now),
            })
        }
    }
}
