//! Wall-clock access and countdown formatting.
//!
//! Schedulers take `now` as an argument; only the station reads a `Clock`.
//! Times are local wall-clock (`NaiveDateTime`) because closing
//! announcements and the midnight rollover are defined in local time.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Local, NaiveDateTime};

pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;
}

/// Reads the operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A settable clock shared between the code under test and the test itself.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, to: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// `M:SS`, or `"0:00"` when `remaining` is zero or negative.
pub fn format_countdown(remaining: Duration) -> String {
    let ms = remaining.num_milliseconds();
    if ms <= 0 {
        return "0:00".to_string();
    }
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    format!("{minutes}:{seconds:02}")
}

/// `H:MM:SS` once an hour or more remains, otherwise the same as
/// [`format_countdown`].
pub fn format_long_countdown(remaining: Duration) -> String {
    let ms = remaining.num_milliseconds();
    if ms <= 0 {
        return "0:00".to_string();
    }
    let hours = ms / 3_600_000;
    if hours == 0 {
        return format_countdown(remaining);
    }
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 10)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn countdown_pads_seconds_only() {
        assert_eq!(format_countdown(Duration::seconds(125)), "2:05");
        assert_eq!(format_countdown(Duration::seconds(59)), "0:59");
        assert_eq!(format_countdown(Duration::minutes(30)), "30:00");
    }

    #[test]
    fn countdown_truncates_partial_seconds() {
        assert_eq!(format_countdown(Duration::milliseconds(125_900)), "2:05");
    }

    #[test]
    fn overdue_is_zero() {
        assert_eq!(format_countdown(Duration::zero()), "0:00");
        assert_eq!(format_countdown(Duration::seconds(-40)), "0:00");
        assert_eq!(format_long_countdown(Duration::seconds(-1)), "0:00");
    }

    #[test]
    fn long_countdown_switches_on_hours() {
        assert_eq!(format_long_countdown(Duration::seconds(3599)), "59:59");
        assert_eq!(format_long_countdown(Duration::seconds(3600)), "1:00:00");
        assert_eq!(
            format_long_countdown(Duration::hours(2) + Duration::seconds(65)),
            "2:01:05"
        );
    }

    #[test]
    fn manual_clock_is_shared() {
        let clock = ManualClock::new(at(9, 0, 0));
        let handle = clock.clone();
        handle.advance(Duration::seconds(90));
        assert_eq!(clock.now(), at(9, 1, 30));
        handle.set(at(23, 59, 59));
        assert_eq!(clock.now(), at(23, 59, 59));
    }
}
