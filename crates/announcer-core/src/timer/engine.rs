//! Recurring announcement scheduler.
//!
//! Like a wall-clock timer engine, the scheduler has no thread of its own:
//! the caller passes `now` into [`RecurringScheduler::tick`] about once a
//! second and speaks whatever comes back.
//!
//! ## Timing model
//!
//! Every timer's next fire time is computed from the instant it actually
//! fired (`now + interval`), not from its nominal due time, so late ticks
//! accumulate as drift. `start()` re-arms every countdown from scratch;
//! `stop()` freezes state without resetting it.
//!
//! ## Usage
//!
//! ```ignore
//! let mut scheduler = RecurringScheduler::new(default_timers(), now)?;
//! scheduler.start(now);
//! // In a loop:
//! for announcement in scheduler.tick(clock.now()) { speech.speak(&announcement.message); }
//! ```

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::{default_timers, TimerConfig, TimerPatch};
use crate::clock::format_countdown;
use crate::error::ValidationError;
use crate::events::{Announcement, AnnouncementSource};
use crate::storage::database::TIMERS_KEY;
use crate::storage::{load_json, save_json, KvStore};

/// Runtime bookkeeping for one timer. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub id: String,
    pub next_trigger: NaiveDateTime,
    pub last_triggered: Option<NaiveDateTime>,
    pub message_index: usize,
}

impl TimerState {
    fn armed(config: &TimerConfig, now: NaiveDateTime) -> Self {
        Self {
            id: config.id.clone(),
            next_trigger: now + config.interval(),
            last_triggered: None,
            message_index: 0,
        }
    }
}

pub struct RecurringScheduler {
    timers: Vec<TimerConfig>,
    /// Parallel to `timers`.
    states: Vec<TimerState>,
    running: bool,
    store: Option<Arc<dyn KvStore>>,
}

impl RecurringScheduler {
    /// In-memory scheduler over the given timers. Nothing is persisted.
    pub fn new(timers: Vec<TimerConfig>, now: NaiveDateTime) -> Result<Self, ValidationError> {
        let timers = sanitize_all(timers)?;
        let states = timers.iter().map(|t| TimerState::armed(t, now)).collect();
        Ok(Self {
            timers,
            states,
            running: false,
            store: None,
        })
    }

    /// Load the timer list from `store`, falling back to the defaults when
    /// the stored blob is absent, malformed or invalid. Every later mutation
    /// of the list is written back.
    pub fn load(store: Arc<dyn KvStore>, now: NaiveDateTime) -> Self {
        let timers = load_json::<Vec<TimerConfig>>(store.as_ref(), TIMERS_KEY)
            .and_then(|stored| match sanitize_all(stored) {
                Ok(timers) => Some(timers),
                Err(e) => {
                    warn!(error = %e, "stored timers invalid, using defaults");
                    None
                }
            })
            .unwrap_or_else(default_timers);
        let states = timers.iter().map(|t| TimerState::armed(t, now)).collect();
        let scheduler = Self {
            timers,
            states,
            running: false,
            store: Some(store),
        };
        scheduler.persist();
        scheduler
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn timers(&self) -> &[TimerConfig] {
        &self.timers
    }

    pub fn states(&self) -> &[TimerState] {
        &self.states
    }

    pub fn timer(&self, id: &str) -> Option<&TimerConfig> {
        self.timers.iter().find(|t| t.id == id)
    }

    pub fn state(&self, id: &str) -> Option<&TimerState> {
        self.states.iter().find(|s| s.id == id)
    }

    /// Countdown to the timer's next fire as `M:SS`; `"0:00"` when overdue,
    /// `None` when stopped or unknown.
    pub fn time_until_next(&self, id: &str, now: NaiveDateTime) -> Option<String> {
        if !self.running {
            return None;
        }
        let state = self.state(id)?;
        Some(format_countdown(state.next_trigger - now))
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Re-arm every countdown to `now + interval` and start firing. Calling
    /// this while running restarts the countdowns.
    pub fn start(&mut self, now: NaiveDateTime) {
        for (timer, state) in self.timers.iter().zip(self.states.iter_mut()) {
            state.next_trigger = now + timer.interval();
        }
        self.running = true;
        info!(timers = self.timers.len(), "recurring timers started");
    }

    /// Stop firing. Countdowns and message cursors are kept.
    pub fn stop(&mut self) {
        self.running = false;
        info!("recurring timers stopped");
    }

    /// Evaluate every enabled timer at `now`, in list order. Each due timer
    /// yields its current message and rolls forward.
    pub fn tick(&mut self, now: NaiveDateTime) -> Vec<Announcement> {
        if !self.running {
            return Vec::new();
        }

        let mut fired = Vec::new();
        for (timer, state) in self.timers.iter().zip(self.states.iter_mut()) {
            if !timer.enabled || now < state.next_trigger {
                continue;
            }
            debug!(id = %timer.id, due = %state.next_trigger, "timer due");
            fired.push(fire(timer, state, now));
        }
        fired
    }

    /// Speak the timer's current message immediately and restart its
    /// countdown, whether or not the scheduler is running. Unknown ids are
    /// ignored.
    pub fn trigger_now(&mut self, id: &str, now: NaiveDateTime) -> Option<Announcement> {
        let index = self.timers.iter().position(|t| t.id == id)?;
        let timer = &self.timers[index];
        let state = &mut self.states[index];
        info!(id, "timer triggered manually");
        Some(fire(timer, state, now))
    }

    /// Merge `patch` into the timer. A changed interval does not move the
    /// pending fire time; it applies from the next fire on.
    pub fn update_timer(&mut self, id: &str, patch: &TimerPatch) -> Result<(), ValidationError> {
        let timer = self
            .timers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ValidationError::UnknownTimer(id.to_string()))?;
        *timer = timer.merged(patch)?;
        self.persist();
        Ok(())
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), ValidationError> {
        self.update_timer(
            id,
            &TimerPatch {
                enabled: Some(enabled),
                ..Default::default()
            },
        )
    }

    /// Append a new timer. Its countdown starts at `now`.
    pub fn add_timer(
        &mut self,
        config: TimerConfig,
        now: NaiveDateTime,
    ) -> Result<(), ValidationError> {
        if self.timer(&config.id).is_some() {
            return Err(ValidationError::DuplicateTimerId(config.id));
        }
        let config = config.sanitize()?;
        self.states.push(TimerState::armed(&config, now));
        self.timers.push(config);
        self.persist();
        Ok(())
    }

    /// Remove a timer together with its runtime state.
    pub fn remove_timer(&mut self, id: &str) -> Result<TimerConfig, ValidationError> {
        let index = self
            .timers
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| ValidationError::UnknownTimer(id.to_string()))?;
        self.states.remove(index);
        let removed = self.timers.remove(index);
        self.persist();
        Ok(removed)
    }

    /// Replace the list with the built-in defaults and fresh runtime state.
    pub fn reset_to_defaults(&mut self, now: NaiveDateTime) {
        self.timers = default_timers();
        self.states = self
            .timers
            .iter()
            .map(|t| TimerState::armed(t, now))
            .collect();
        self.persist();
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            save_json(store.as_ref(), TIMERS_KEY, &self.timers);
        }
    }
}

fn fire(timer: &TimerConfig, state: &mut TimerState, now: NaiveDateTime) -> Announcement {
    let len = timer.messages.len().max(1);
    let message = timer
        .messages
        .get(state.message_index % len)
        .cloned()
        .unwrap_or_default();

    state.last_triggered = Some(now);
    state.next_trigger = now + timer.interval();
    state.message_index = (state.message_index + 1) % len;

    Announcement {
        message,
        source: AnnouncementSource::Timer {
            timer: timer.clone(),
        },
    }
}

fn sanitize_all(timers: Vec<TimerConfig>) -> Result<Vec<TimerConfig>, ValidationError> {
    let mut seen = std::collections::HashSet::new();
    timers
        .into_iter()
        .map(|t| {
            if !seen.insert(t.id.clone()) {
                return Err(ValidationError::DuplicateTimerId(t.id));
            }
            t.sanitize()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 10)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap()
    }

    fn timer(id: &str, minutes: i64, messages: &[&str]) -> TimerConfig {
        TimerConfig {
            id: id.into(),
            name: id.into(),
            interval_minutes: minutes,
            messages: messages.iter().map(|m| m.to_string()).collect(),
            enabled: true,
            icon: String::new(),
            color: String::new(),
        }
    }

    fn messages(fired: &[Announcement]) -> Vec<&str> {
        fired.iter().map(|a| a.message.as_str()).collect()
    }

    #[test]
    fn rotation_wraps_around() {
        let mut s = RecurringScheduler::new(vec![timer("a", 5, &["m0", "m1", "m2"])], t0()).unwrap();
        let spoken: Vec<String> = (0..4)
            .map(|_| s.trigger_now("a", t0()).unwrap().message)
            .collect();
        assert_eq!(spoken, ["m0", "m1", "m2", "m0"]);
    }

    #[test]
    fn nothing_fires_while_stopped() {
        let mut s = RecurringScheduler::new(vec![timer("a", 1, &["x"])], t0()).unwrap();
        assert!(s.tick(t0() + Duration::hours(1)).is_empty());
    }

    #[test]
    fn tick_fires_when_due_and_reschedules_from_fire_time() {
        let mut s = RecurringScheduler::new(vec![timer("a", 10, &["x", "y"])], t0()).unwrap();
        s.start(t0());
        assert!(s.tick(t0() + Duration::seconds(599)).is_empty());

        // Two seconds late: the next fire is measured from here.
        let late = t0() + Duration::seconds(602);
        assert_eq!(messages(&s.tick(late)), ["x"]);
        let state = s.state("a").unwrap();
        assert_eq!(state.next_trigger, late + Duration::minutes(10));
        assert_eq!(state.last_triggered, Some(late));
        assert_eq!(state.message_index, 1);
        assert!(s.tick(late + Duration::seconds(1)).is_empty());
    }

    #[test]
    fn disabled_timers_do_not_fire() {
        let mut s = RecurringScheduler::new(vec![timer("a", 1, &["x"])], t0()).unwrap();
        s.set_enabled("a", false).unwrap();
        s.start(t0());
        assert!(s.tick(t0() + Duration::minutes(5)).is_empty());
    }

    #[test]
    fn due_timers_fire_in_list_order() {
        let mut s = RecurringScheduler::new(
            vec![timer("b", 5, &["from b"]), timer("a", 5, &["from a"])],
            t0(),
        )
        .unwrap();
        s.start(t0());
        assert_eq!(
            messages(&s.tick(t0() + Duration::minutes(5))),
            ["from b", "from a"]
        );
    }

    #[test]
    fn start_rearms_and_stop_preserves() {
        let mut s = RecurringScheduler::new(vec![timer("a", 10, &["x", "y"])], t0()).unwrap();
        s.start(t0());
        s.tick(t0() + Duration::minutes(10));
        s.stop();
        let frozen = s.state("a").unwrap().clone();
        assert_eq!(frozen.message_index, 1);

        let later = t0() + Duration::minutes(30);
        s.start(later);
        let rearmed = s.state("a").unwrap();
        assert_eq!(rearmed.next_trigger, later + Duration::minutes(10));
        assert_eq!(rearmed.message_index, 1);
    }

    #[test]
    fn trigger_now_works_while_stopped_and_resets_countdown() {
        let mut s = RecurringScheduler::new(vec![timer("a", 10, &["x"])], t0()).unwrap();
        let when = t0() + Duration::minutes(3);
        assert!(s.trigger_now("a", when).is_some());
        assert_eq!(s.state("a").unwrap().next_trigger, when + Duration::minutes(10));
        assert!(s.trigger_now("missing", when).is_none());
    }

    #[test]
    fn countdown_formatting() {
        let mut s = RecurringScheduler::new(vec![timer("a", 10, &["x"])], t0()).unwrap();
        assert_eq!(s.time_until_next("a", t0()), None);
        s.start(t0());
        let now = t0() + Duration::minutes(10) - Duration::seconds(125);
        assert_eq!(s.time_until_next("a", now).as_deref(), Some("2:05"));
        assert_eq!(
            s.time_until_next("a", t0() + Duration::hours(2)).as_deref(),
            Some("0:00")
        );
        assert_eq!(s.time_until_next("nope", now), None);
    }

    #[test]
    fn interval_edit_waits_for_next_fire() {
        let mut s = RecurringScheduler::new(vec![timer("a", 10, &["x"])], t0()).unwrap();
        s.start(t0());
        let patch = TimerPatch {
            interval_minutes: Some(2),
            ..Default::default()
        };
        s.update_timer("a", &patch).unwrap();
        assert!(s.tick(t0() + Duration::minutes(3)).is_empty());
        let fire_at = t0() + Duration::minutes(10);
        assert_eq!(s.tick(fire_at).len(), 1);
        assert_eq!(s.state("a").unwrap().next_trigger, fire_at + Duration::minutes(2));
    }

    #[test]
    fn shrinking_messages_keeps_cursor_in_range() {
        let mut s = RecurringScheduler::new(vec![timer("a", 10, &["x", "y", "z"])], t0()).unwrap();
        s.trigger_now("a", t0());
        s.trigger_now("a", t0());
        let patch = TimerPatch {
            messages: Some(vec!["only".into()]),
            ..Default::default()
        };
        s.update_timer("a", &patch).unwrap();
        assert_eq!(s.trigger_now("a", t0()).unwrap().message, "only");
        assert_eq!(s.state("a").unwrap().message_index, 0);
    }

    #[test]
    fn add_and_remove_timers() {
        let mut s = RecurringScheduler::new(vec![timer("a", 10, &["x"])], t0()).unwrap();
        s.add_timer(timer("b", 15, &["", "hi"]), t0()).unwrap();
        assert_eq!(s.timer("b").unwrap().messages, ["hi"]);
        assert_eq!(
            s.state("b").unwrap().next_trigger,
            t0() + Duration::minutes(15)
        );
        assert!(matches!(
            s.add_timer(timer("b", 15, &["again"]), t0()),
            Err(ValidationError::DuplicateTimerId(_))
        ));

        s.remove_timer("a").unwrap();
        assert!(s.state("a").is_none());
        assert_eq!(s.timers().len(), 1);
        assert!(s.remove_timer("a").is_err());
    }

    #[test]
    fn rejects_invalid_interval_on_construction() {
        assert!(RecurringScheduler::new(vec![timer("a", 0, &["x"])], t0()).is_err());
    }

    #[test]
    fn load_seeds_defaults_and_persists_edits() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let mut s = RecurringScheduler::load(store.clone(), t0());
        assert_eq!(s.timers(), default_timers().as_slice());

        s.set_enabled("ads", false).unwrap();
        let reloaded = RecurringScheduler::load(store, t0());
        assert!(!reloaded.timer("ads").unwrap().enabled);
    }

    #[test]
    fn corrupt_or_invalid_blob_falls_back_to_defaults() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        store.kv_set(TIMERS_KEY, "{oops").unwrap();
        assert_eq!(
            RecurringScheduler::load(store.clone(), t0()).timers(),
            default_timers().as_slice()
        );

        let invalid = serde_json::to_string(&vec![timer("a", -5, &["x"])]).unwrap();
        store.kv_set(TIMERS_KEY, &invalid).unwrap();
        assert_eq!(
            RecurringScheduler::load(store, t0()).timers(),
            default_timers().as_slice()
        );
    }

    #[test]
    fn out_of_range_stored_interval_falls_back_to_defaults() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        store
            .kv_set(
                TIMERS_KEY,
                r#"[{"id":"a","name":"a","intervalMinutes":9000000000000000,"messages":["x"],"enabled":true}]"#,
            )
            .unwrap();
        let s = RecurringScheduler::load(store, t0());
        assert_eq!(s.timers(), default_timers().as_slice());
    }

    #[test]
    fn add_timer_rejects_interval_above_an_hour() {
        let mut s = RecurringScheduler::new(default_timers(), t0()).unwrap();
        assert!(s.add_timer(timer("long", 61, &["x"]), t0()).is_err());
        assert!(s.timer("long").is_none());
    }
}
