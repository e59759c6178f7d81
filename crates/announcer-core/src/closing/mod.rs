mod announcer;
mod schedule;

pub use announcer::ClosingAnnouncer;
pub use schedule::{
    default_closing_announcements, parse_clock_time, ClosingAnnouncement, ClosingSchedule,
};
