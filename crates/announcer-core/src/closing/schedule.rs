use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One fixed daily closing announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingAnnouncement {
    pub id: String,
    /// Local wall-clock time, `HH:MM`.
    pub time: String,
    /// 0 marks the closing moment itself.
    pub minutes_until_close: u32,
}

impl ClosingAnnouncement {
    pub fn new(id: impl Into<String>, time: impl Into<String>, minutes_until_close: u32) -> Self {
        Self {
            id: id.into(),
            time: time.into(),
            minutes_until_close,
        }
    }

    pub fn is_closing_moment(&self) -> bool {
        self.minutes_until_close == 0
    }
}

pub fn default_closing_announcements() -> Vec<ClosingAnnouncement> {
    vec![
        ClosingAnnouncement::new("closing-30", "21:30", 30),
        ClosingAnnouncement::new("closing-15", "21:45", 15),
        ClosingAnnouncement::new("closing-0", "22:00", 0),
    ]
}

/// Parse `HH:MM` into a time of day.
pub fn parse_clock_time(s: &str) -> Result<NaiveTime, ValidationError> {
    let invalid = || ValidationError::InvalidClockTime(s.to_string());
    let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
    let hours: u32 = h.parse().map_err(|_| invalid())?;
    let minutes: u32 = m.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

/// A validated closing schedule: times parsed, sorted ascending, exactly one
/// closing moment.
#[derive(Debug, Clone)]
pub struct ClosingSchedule {
    entries: Vec<(ClosingAnnouncement, NaiveTime)>,
}

impl ClosingSchedule {
    pub fn new(announcements: Vec<ClosingAnnouncement>) -> Result<Self, ValidationError> {
        let moments = announcements
            .iter()
            .filter(|a| a.is_closing_moment())
            .count();
        if moments != 1 {
            return Err(ValidationError::ClosingMomentCount(moments));
        }

        let mut entries = announcements
            .into_iter()
            .map(|a| parse_clock_time(&a.time).map(|t| (a, t)))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|(_, t)| *t);
        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClosingAnnouncement, NaiveTime)> {
        self.entries.iter().map(|(a, t)| (a, *t))
    }

    pub fn announcements(&self) -> Vec<ClosingAnnouncement> {
        self.entries.iter().map(|(a, _)| a.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&ClosingAnnouncement> {
        self.entries.iter().map(|(a, _)| a).find(|a| a.id == id)
    }

    /// The `HH:MM` of the closing moment.
    pub fn closing_time(&self) -> &str {
        self.entries
            .iter()
            .map(|(a, _)| a)
            .find(|a| a.is_closing_moment())
            .map(|a| a.time.as_str())
            .unwrap_or_default()
    }
}

impl Default for ClosingSchedule {
    fn default() -> Self {
        let entries = default_closing_announcements()
            .into_iter()
            .filter_map(|a| parse_clock_time(&a.time).ok().map(|t| (a, t)))
            .collect();
        Self { entries }
    }
}
