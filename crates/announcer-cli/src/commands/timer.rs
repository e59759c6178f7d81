use clap::Subcommand;
use serde::Serialize;

use announcer_core::timer::{RecurringScheduler, TimerConfig, TimerPatch};
use announcer_core::{Clock, SystemClock};

use super::{drain, open_station, open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// List all timers
    List,
    /// Print one timer as JSON
    Show {
        /// Timer id
        id: String,
    },
    /// Add a new timer
    Add {
        /// Unique timer id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        /// Display name
        #[arg(long)]
        name: String,
        /// Interval in minutes (1-60)
        #[arg(long)]
        interval: i64,
        /// Message to rotate through (repeatable)
        #[arg(long = "message", required = true)]
        messages: Vec<String>,
        #[arg(long, default_value = "")]
        icon: String,
        #[arg(long, default_value = "")]
        color: String,
        /// Create the timer disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Edit an existing timer
    Set {
        /// Timer id
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// Interval in minutes; applies after the next fire
        #[arg(long)]
        interval: Option<i64>,
        /// Replace the messages (repeatable)
        #[arg(long = "message")]
        messages: Vec<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Enable a timer
    Enable { id: String },
    /// Disable a timer
    Disable { id: String },
    /// Remove a timer
    Remove { id: String },
    /// Speak a timer's current message now
    Trigger { id: String },
    /// Restore the built-in timers
    Reset,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TimerOutput<'a> {
    TimerAdded { timer: &'a TimerConfig },
    TimerUpdated { timer: &'a TimerConfig },
    TimerRemoved { timer: &'a TimerConfig },
    TimersReset { timers: &'a [TimerConfig] },
}

pub async fn run(action: TimerAction) -> CliResult {
    let now = SystemClock.now();
    let load = || -> Result<RecurringScheduler, Box<dyn std::error::Error>> {
        Ok(RecurringScheduler::load(open_store()?, now))
    };

    match action {
        TimerAction::List => print_json(load()?.timers()),
        TimerAction::Show { id } => print_json(lookup(&load()?, &id)?),
        TimerAction::Add {
            id,
            name,
            interval,
            messages,
            icon,
            color,
            disabled,
        } => {
            let mut scheduler = load()?;
            let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let config = TimerConfig {
                id: id.clone(),
                name,
                interval_minutes: interval,
                messages,
                enabled: !disabled,
                icon,
                color,
            };
            scheduler.add_timer(config, now)?;
            print_json(&TimerOutput::TimerAdded {
                timer: lookup(&scheduler, &id)?,
            })
        }
        TimerAction::Set {
            id,
            name,
            interval,
            messages,
            icon,
            color,
        } => {
            let patch = TimerPatch {
                name,
                interval_minutes: interval,
                messages: (!messages.is_empty()).then_some(messages),
                enabled: None,
                icon,
                color,
            };
            update(load()?, &id, &patch)
        }
        TimerAction::Enable { id } => update(load()?, &id, &enabled(true)),
        TimerAction::Disable { id } => update(load()?, &id, &enabled(false)),
        TimerAction::Remove { id } => {
            let removed = load()?.remove_timer(&id)?;
            print_json(&TimerOutput::TimerRemoved { timer: &removed })
        }
        TimerAction::Trigger { id } => {
            let mut station = open_station()?;
            let announcement = station
                .trigger_timer(&id)
                .ok_or_else(|| format!("unknown timer: {id}"))?;
            drain(&mut station).await;
            print_json(&announcement)
        }
        TimerAction::Reset => {
            let mut scheduler = load()?;
            scheduler.reset_to_defaults(now);
            print_json(&TimerOutput::TimersReset {
                timers: scheduler.timers(),
            })
        }
    }
}

fn enabled(enabled: bool) -> TimerPatch {
    TimerPatch {
        enabled: Some(enabled),
        ..Default::default()
    }
}

fn update(mut scheduler: RecurringScheduler, id: &str, patch: &TimerPatch) -> CliResult {
    scheduler.update_timer(id, patch)?;
    print_json(&TimerOutput::TimerUpdated {
        timer: lookup(&scheduler, id)?,
    })
}

fn lookup<'a>(
    scheduler: &'a RecurringScheduler,
    id: &str,
) -> Result<&'a TimerConfig, Box<dyn std::error::Error>> {
    Ok(scheduler
        .timer(id)
        .ok_or_else(|| format!("unknown timer: {id}"))?)
}
