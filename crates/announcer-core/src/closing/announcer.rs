//! Fixed-time closing announcements.
//!
//! Each entry fires at most once per calendar day. A tick fires an entry when
//! it lands within one second of the entry's time today; the day ledger stops
//! later ticks in the same window (or later in the day) from firing it again.
//! The ledger is cleared by [`ClosingAnnouncer::check_rollover`] at midnight.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use tracing::{debug, info};

use super::schedule::{ClosingAnnouncement, ClosingSchedule};
use crate::clock::format_long_countdown;
use crate::events::{Announcement, AnnouncementSource};

const FIRE_WINDOW_MS: i64 = 1000;

#[derive(Debug, Clone)]
pub struct ClosingAnnouncer {
    schedule: ClosingSchedule,
    venue: String,
    enabled: bool,
    /// announcement id -> day it last fired.
    ledger: BTreeMap<String, NaiveDate>,
}

impl ClosingAnnouncer {
    pub fn new(schedule: ClosingSchedule, venue: impl Into<String>) -> Self {
        Self {
            schedule,
            venue: venue.into(),
            enabled: true,
            ledger: BTreeMap::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn schedule(&self) -> &ClosingSchedule {
        &self.schedule
    }

    pub fn closing_time(&self) -> &str {
        self.schedule.closing_time()
    }

    pub fn ledger(&self) -> &BTreeMap<String, NaiveDate> {
        &self.ledger
    }

    pub fn fired_today(&self, id: &str, now: NaiveDateTime) -> bool {
        self.ledger.get(id) == Some(&now.date())
    }

    /// First entry, in time order, that is still ahead today and has not
    /// fired today.
    pub fn next_announcement(&self, now: NaiveDateTime) -> Option<&ClosingAnnouncement> {
        self.schedule
            .iter()
            .find(|(a, t)| now < now.date().and_time(*t) && !self.fired_today(&a.id, now))
            .map(|(a, _)| a)
    }

    /// Countdown to [`Self::next_announcement`], `H:MM:SS` or `M:SS`.
    pub fn time_until_next(&self, now: NaiveDateTime) -> Option<String> {
        let next = self.next_announcement(now)?;
        let (_, time) = self.schedule.iter().find(|(a, _)| a.id == next.id)?;
        Some(format_long_countdown(now.date().and_time(time) - now))
    }

    /// Spoken text for an entry.
    pub fn message_for(&self, announcement: &ClosingAnnouncement) -> String {
        closing_message(&self.venue, announcement.minutes_until_close)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Flip the gate on automatic firing. Manual triggers ignore it.
    pub fn toggle_enabled(&mut self) -> bool {
        self.enabled = !self.enabled;
        info!(enabled = self.enabled, "closing announcements toggled");
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Evaluate the schedule at `now`; returns the entries that fired.
    pub fn tick(&mut self, now: NaiveDateTime) -> Vec<Announcement> {
        if !self.enabled {
            return Vec::new();
        }

        let today = now.date();
        let mut fired = Vec::new();
        for (announcement, time) in self.schedule.iter() {
            let delta = (now - today.and_time(time)).num_milliseconds().abs();
            if delta >= FIRE_WINDOW_MS || self.ledger.get(&announcement.id) == Some(&today) {
                continue;
            }
            info!(id = %announcement.id, time = %announcement.time, "closing announcement due");
            fired.push((announcement.clone(), self.build(announcement)));
        }

        fired
            .into_iter()
            .map(|(announcement, out)| {
                self.ledger.insert(announcement.id, today);
                out
            })
            .collect()
    }

    /// Speak an entry now without touching the ledger.
    pub fn trigger_manually(&self, id: &str) -> Option<Announcement> {
        let announcement = self.schedule.get(id)?;
        debug!(id, "closing announcement triggered manually");
        Some(self.build(announcement))
    }

    /// Clear the ledger once the wall-clock reads 00:00. Returns whether it
    /// was cleared. Meant for a coarse interval; repeated calls within the
    /// midnight minute are harmless.
    pub fn check_rollover(&mut self, now: NaiveDateTime) -> bool {
        if now.hour() == 0 && now.minute() == 0 && !self.ledger.is_empty() {
            self.ledger.clear();
            info!("closing ledger reset for new day");
            return true;
        }
        false
    }

    fn build(&self, announcement: &ClosingAnnouncement) -> Announcement {
        Announcement {
            message: self.message_for(announcement),
            source: AnnouncementSource::Closing {
                id: announcement.id.clone(),
                minutes_until_close: announcement.minutes_until_close,
            },
        }
    }
}

impl Default for ClosingAnnouncer {
    fn default() -> Self {
        Self::new(ClosingSchedule::default(), "a academia")
    }
}

fn closing_message(venue: &str, minutes_until_close: u32) -> String {
    match minutes_until_close {
        0 => format!(
            "Atenção alunos, {venue} está encerrando suas atividades por hoje. \
             Agradecemos a presença de todos e desejamos uma ótima noite!"
        ),
        n => {
            let unit = if n == 1 { "minuto" } else { "minutos" };
            format!(
                "Atenção, {venue} encerrará suas atividades em {n} {unit}. \
                 Por favor, prepare-se para finalizar seus treinos e guarde os pesos \
                 e aparelhos utilizados. Obrigado."
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn ids(fired: &[Announcement]) -> Vec<String> {
        fired
            .iter()
            .map(|a| match &a.source {
                AnnouncementSource::Closing { id, .. } => id.clone(),
                other => panic!("unexpected source {other:?}"),
            })
            .collect()
    }

    #[test]
    fn fires_once_inside_window() {
        let mut announcer = ClosingAnnouncer::default();
        assert!(announcer.tick(at(10, 21, 29, 58)).is_empty());

        let fired = announcer.tick(at(10, 21, 30, 0));
        assert_eq!(ids(&fired), ["closing-30"]);
        assert!(fired[0].message.contains("30 minutos"));

        // Same window, later in the day: no repeat.
        let just_after = at(10, 21, 30, 0) + Duration::milliseconds(500);
        assert!(announcer.tick(just_after).is_empty());
        assert!(announcer.tick(at(10, 23, 0, 0)).is_empty());
    }

    #[test]
    fn fires_slightly_early_tick() {
        let mut announcer = ClosingAnnouncer::default();
        let early = at(10, 21, 45, 0) - Duration::milliseconds(300);
        assert_eq!(ids(&announcer.tick(early)), ["closing-15"]);
        assert!(announcer.tick(at(10, 21, 45, 0)).is_empty());
    }

    #[test]
    fn closing_moment_has_its_own_wording() {
        let mut announcer = ClosingAnnouncer::default();
        let fired = announcer.tick(at(10, 22, 0, 0));
        assert_eq!(ids(&fired), ["closing-0"]);
        assert!(fired[0].message.contains("encerrando suas atividades por hoje"));
    }

    #[test]
    fn disabled_blocks_ticks_but_not_manual() {
        let mut announcer = ClosingAnnouncer::default();
        assert!(!announcer.toggle_enabled());
        assert!(announcer.tick(at(10, 21, 30, 0)).is_empty());
        assert!(announcer.trigger_manually("closing-30").is_some());
        assert!(announcer.toggle_enabled());
    }

    #[test]
    fn manual_trigger_leaves_ledger_alone() {
        let mut announcer = ClosingAnnouncer::default();
        announcer.trigger_manually("closing-0").unwrap();
        announcer.trigger_manually("closing-0").unwrap();
        assert!(announcer.ledger().is_empty());
        assert_eq!(ids(&announcer.tick(at(10, 22, 0, 0))), ["closing-0"]);
    }

    #[test]
    fn unknown_manual_id_is_noop() {
        assert!(ClosingAnnouncer::default().trigger_manually("nope").is_none());
    }

    #[test]
    fn rollover_clears_ledger_at_midnight_only() {
        let mut announcer = ClosingAnnouncer::default();
        announcer.tick(at(10, 21, 30, 0));
        assert!(!announcer.check_rollover(at(10, 23, 59, 30)));
        assert_eq!(announcer.ledger().len(), 1);
        assert!(announcer.check_rollover(at(11, 0, 0, 20)));
        assert!(announcer.ledger().is_empty());
        assert!(!announcer.check_rollover(at(11, 0, 0, 50)));
        assert_eq!(ids(&announcer.tick(at(11, 21, 30, 0))), ["closing-30"]);
    }

    #[test]
    fn next_announcement_skips_fired_and_past() {
        let mut announcer = ClosingAnnouncer::default();
        let next = announcer.next_announcement(at(10, 20, 0, 0)).unwrap();
        assert_eq!(next.id, "closing-30");
        assert_eq!(
            announcer.time_until_next(at(10, 20, 0, 0)).as_deref(),
            Some("1:30:00")
        );

        announcer.tick(at(10, 21, 30, 0));
        let next = announcer.next_announcement(at(10, 21, 30, 0)).unwrap();
        assert_eq!(next.id, "closing-15");
        assert_eq!(
            announcer.time_until_next(at(10, 21, 42, 55)).as_deref(),
            Some("2:05")
        );

        assert!(announcer.next_announcement(at(10, 22, 0, 1)).is_none());
        assert!(announcer.time_until_next(at(10, 22, 0, 1)).is_none());
    }
}
