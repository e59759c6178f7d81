use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::speech::{SpeechState, VoiceEngine};
use crate::timer::TimerConfig;

/// Where an announcement came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnnouncementSource {
    /// A recurring timer fired (tick-driven or manual trigger).
    Timer { timer: TimerConfig },
    /// A fixed-time closing announcement.
    Closing { id: String, minutes_until_close: u32 },
    /// The top-of-the-hour chime.
    Hourly,
}

/// A message produced by one of the schedulers, on its way to the speech
/// engine. Schedulers hand these back from `tick`; nothing flows the other
/// way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub message: String,
    pub source: AnnouncementSource,
}

impl Announcement {
    pub fn is_closing(&self) -> bool {
        matches!(self.source, AnnouncementSource::Closing { .. })
    }
}

/// Every observable change in the station produces an Event.
/// The presentation layer subscribes to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SchedulerStarted {
        at: NaiveDateTime,
    },
    SchedulerStopped {
        at: NaiveDateTime,
    },
    Announced {
        announcement: Announcement,
        at: NaiveDateTime,
    },
    SpeechStateChanged {
        state: SpeechState,
        queued: usize,
    },
    /// A remote engine failed and the next engine in the chain takes over.
    EngineFallback {
        from: VoiceEngine,
        to: VoiceEngine,
        reason: String,
    },
    /// An item was abandoned without being spoken.
    SpeechDropped {
        text: String,
        reason: String,
    },
    DuckingChanged {
        multiplier: f32,
    },
    ClosingLedgerReset {
        at: NaiveDateTime,
    },
}
