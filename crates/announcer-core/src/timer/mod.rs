mod config;
mod engine;

pub use config::{default_timers, TimerConfig, TimerPatch, MAX_INTERVAL_MINUTES};
pub use engine::{RecurringScheduler, TimerState};
