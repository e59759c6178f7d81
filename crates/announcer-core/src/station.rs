//! Station: owns every component and drives them from the clock.
//!
//! The station is the only place that reads a [`Clock`]. On each fine tick it
//! asks the closing announcer and the recurring timers what is due and routes
//! the results to the speech engine. The coarse tick handles the midnight
//! ledger reset and the hourly chime. Ducking is bracketed here: media is
//! lowered right before an item is queued and restored once the engine has
//! drained.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::closing::ClosingAnnouncer;
use crate::ducking::{DuckingCoordinator, MediaVolume};
use crate::error::Result;
use crate::events::{Announcement, Event};
use crate::hourly::HourlyChime;
use crate::speech::{SpeechBackends, SpeechEngine};
use crate::storage::{Config, KvStore, StationConfig};
use crate::timer::RecurringScheduler;

const EVENT_CAPACITY: usize = 256;

/// The most recent announcement handed to the speech engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastAnnouncement {
    pub announcement: Announcement,
    pub closing: bool,
    pub at: NaiveDateTime,
}

pub struct Station {
    clock: Arc<dyn Clock>,
    settings: StationConfig,
    timers: RecurringScheduler,
    closing: ClosingAnnouncer,
    hourly: HourlyChime,
    speech: SpeechEngine,
    ducking: DuckingCoordinator,
    events: broadcast::Sender<Event>,
    last_announcement: Option<LastAnnouncement>,
}

impl Station {
    /// Build every component from `config`, restoring persisted timers,
    /// speech settings and the hourly flag from `store`.
    pub fn open(
        config: &Config,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        backends: SpeechBackends,
        media: Arc<dyn MediaVolume>,
    ) -> Result<Self> {
        let schedule = config.closing_schedule()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let now = clock.now();

        Ok(Self {
            settings: config.station.clone(),
            timers: RecurringScheduler::load(store.clone(), now),
            closing: ClosingAnnouncer::new(schedule, config.closing.venue.clone()),
            hourly: HourlyChime::load(store.clone()),
            speech: SpeechEngine::load(backends, store, events.clone()),
            ducking: DuckingCoordinator::new(media, config.ducking.level),
            clock,
            events,
            last_announcement: None,
        })
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn timers(&self) -> &RecurringScheduler {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut RecurringScheduler {
        &mut self.timers
    }

    pub fn closing(&self) -> &ClosingAnnouncer {
        &self.closing
    }

    pub fn closing_mut(&mut self) -> &mut ClosingAnnouncer {
        &mut self.closing
    }

    pub fn hourly(&self) -> &HourlyChime {
        &self.hourly
    }

    pub fn hourly_mut(&mut self) -> &mut HourlyChime {
        &mut self.hourly
    }

    pub fn speech(&self) -> &SpeechEngine {
        &self.speech
    }

    pub fn ducking(&self) -> &DuckingCoordinator {
        &self.ducking
    }

    pub fn last_announcement(&self) -> Option<&LastAnnouncement> {
        self.last_announcement.as_ref()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    pub fn start_timers(&mut self) {
        let at = self.clock.now();
        self.timers.start(at);
        self.emit(Event::SchedulerStarted { at });
    }

    pub fn stop_timers(&mut self) {
        self.timers.stop();
        self.emit(Event::SchedulerStopped {
            at: self.clock.now(),
        });
    }

    /// Fine tick: closing entries first, then the recurring timers.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        let mut due = self.closing.tick(now);
        due.extend(self.timers.tick(now));
        for announcement in due {
            self.route(announcement, now);
        }
        self.sync_ducking();
    }

    /// Coarse tick: midnight ledger reset and the hourly chime.
    pub fn check_rollover(&mut self) {
        let now = self.clock.now();
        if self.closing.check_rollover(now) {
            self.emit(Event::ClosingLedgerReset { at: now });
        }
        if let Some(announcement) = self.hourly.tick(now) {
            self.route(announcement, now);
        }
    }

    /// Tick until `shutdown` resolves, then cancel any speech in flight.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        let mut tick = tokio::time::interval(Duration::from_millis(self.settings.tick_ms.max(1)));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut rollover =
            tokio::time::interval(Duration::from_secs(self.settings.rollover_check_secs.max(1)));
        rollover.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut status = self.speech.subscribe();
        tokio::pin!(shutdown);

        info!(tick_ms = self.settings.tick_ms, "station running");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tick.tick() => self.tick(),
                _ = rollover.tick() => self.check_rollover(),
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.sync_ducking();
                }
            }
        }

        self.speech.stop();
        self.sync_ducking();
        info!("station stopped");
    }

    // ── Manual triggers ──────────────────────────────────────────────

    /// Fire a recurring timer now. Unknown ids are ignored.
    pub fn trigger_timer(&mut self, id: &str) -> Option<Announcement> {
        let now = self.clock.now();
        let announcement = self.timers.trigger_now(id, now)?;
        self.route(announcement.clone(), now);
        Some(announcement)
    }

    /// Speak a closing entry now. The day ledger is left alone.
    pub fn trigger_closing(&mut self, id: &str) -> Option<Announcement> {
        let now = self.clock.now();
        let announcement = self.closing.trigger_manually(id)?;
        self.route(announcement.clone(), now);
        Some(announcement)
    }

    /// Speak the current time regardless of the hourly flag.
    pub fn test_hourly(&mut self) -> Announcement {
        let now = self.clock.now();
        let announcement = self.hourly.test_announcement(now);
        self.route(announcement.clone(), now);
        announcement
    }

    /// Speak free text through the same ducking bracket.
    pub fn say(&mut self, text: &str) {
        self.duck();
        self.speech.speak(text);
    }

    /// Cancel speech and restore media volume.
    pub fn stop_speech(&mut self) {
        self.speech.stop();
        self.sync_ducking();
    }

    // ── Routing ──────────────────────────────────────────────────────

    fn route(&mut self, announcement: Announcement, at: NaiveDateTime) {
        let closing = announcement.is_closing();
        info!(message = %announcement.message, closing, "announcing");

        self.duck();
        if closing && self.settings.closing_priority {
            self.speech.speak_priority(announcement.message.clone());
        } else {
            self.speech.speak(announcement.message.clone());
        }

        self.last_announcement = Some(LastAnnouncement {
            announcement: announcement.clone(),
            closing,
            at,
        });
        self.emit(Event::Announced { announcement, at });
    }

    fn duck(&mut self) {
        if !self.ducking.is_ducked() {
            self.ducking.on_announcement_start();
            self.emit(Event::DuckingChanged {
                multiplier: self.ducking.multiplier(),
            });
        }
    }

    /// Restore media once the engine has nothing left to say.
    fn sync_ducking(&mut self) {
        if self.ducking.is_ducked() && self.speech.status().is_idle() {
            self.ducking.on_announcement_end();
            debug!("speech drained, media restored");
            self.emit(Event::DuckingChanged {
                multiplier: self.ducking.multiplier(),
            });
        }
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
