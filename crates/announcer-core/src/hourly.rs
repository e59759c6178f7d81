//! Top-of-the-hour chime.
//!
//! Evaluated on the station's coarse interval. Fires once during minute 0 of
//! each hour; the last announced hour guards against a second fire within
//! the same minute.

use std::sync::Arc;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::events::{Announcement, AnnouncementSource};
use crate::storage::database::HOURLY_KEY;
use crate::storage::{load_json, save_json, KvStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlySettings {
    pub enabled: bool,
}

pub struct HourlyChime {
    enabled: bool,
    last_announced_hour: Option<u32>,
    store: Option<Arc<dyn KvStore>>,
}

impl HourlyChime {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last_announced_hour: None,
            store: None,
        }
    }

    /// Restore the enabled flag from `store` (off when absent or corrupt).
    pub fn load(store: Arc<dyn KvStore>) -> Self {
        let settings = load_json::<HourlySettings>(store.as_ref(), HOURLY_KEY).unwrap_or_default();
        Self {
            enabled: settings.enabled,
            last_announced_hour: None,
            store: Some(store),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn toggle_enabled(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if let Some(store) = &self.store {
            save_json(store.as_ref(), HOURLY_KEY, &HourlySettings { enabled });
        }
        info!(enabled, "hourly chime toggled");
    }

    pub fn tick(&mut self, now: NaiveDateTime) -> Option<Announcement> {
        if !self.enabled || now.minute() != 0 {
            return None;
        }
        let hour = now.hour();
        if self.last_announced_hour == Some(hour) {
            return None;
        }
        self.last_announced_hour = Some(hour);
        Some(Announcement {
            message: format!("São {}", hour_words(hour)),
            source: AnnouncementSource::Hourly,
        })
    }

    /// Speak the current time, hours and minutes, regardless of the flag.
    pub fn test_announcement(&self, now: NaiveDateTime) -> Announcement {
        let hour = match now.hour() {
            0 => "meia noite".to_string(),
            12 => "meio dia".to_string(),
            h => format!("{h} horas"),
        };
        let minute = match now.minute() {
            0 => String::new(),
            1 => " e um minuto".to_string(),
            m => format!(" e {m} minutos"),
        };
        Announcement {
            message: format!("São {hour}{minute}"),
            source: AnnouncementSource::Hourly,
        }
    }
}

fn hour_words(hour: u32) -> &'static str {
    const WORDS: [&str; 24] = [
        "meia noite",
        "uma hora",
        "duas horas",
        "três horas",
        "quatro horas",
        "cinco horas",
        "seis horas",
        "sete horas",
        "oito horas",
        "nove horas",
        "dez horas",
        "onze horas",
        "meio dia",
        "treze horas",
        "quatorze horas",
        "quinze horas",
        "dezesseis horas",
        "dezessete horas",
        "dezoito horas",
        "dezenove horas",
        "vinte horas",
        "vinte e uma horas",
        "vinte e duas horas",
        "vinte e três horas",
    ];
    WORDS.get(hour as usize).copied().unwrap_or_default()
}
