//! Serialized speech queue with engine fallback.
//!
//! `speak` appends to a FIFO queue and spawns a worker task when none is
//! running. The worker drains the queue one item at a time: remote synthesis
//! (Loading), then playback (Speaking). A failing remote engine hands the same
//! text to the next engine in the chain. `stop` bumps a generation counter and
//! wakes the worker, whose in-flight futures are dropped, killing any player
//! or synthesizer process.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch, Notify};
use tracing::{debug, info, warn};

use super::settings::{SettingsCell, SpeechSettings, SpeechSettingsPatch, VoiceEngine};
use super::SpeechBackends;
use crate::error::{SpeechError, ValidationError};
use crate::events::Event;
use crate::storage::KvStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechState {
    Idle,
    /// Remote synthesis in flight.
    Loading,
    /// Audio or a local utterance is playing.
    Speaking,
    /// Transient: reported on `stop()` before returning to Idle.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechStatus {
    pub state: SpeechState,
    /// Items waiting behind the current one.
    pub queued: usize,
}

impl SpeechStatus {
    pub fn is_idle(&self) -> bool {
        self.state == SpeechState::Idle && self.queued == 0
    }
}

#[derive(Default)]
struct Queue {
    items: VecDeque<String>,
    /// Leading items of `items` that were queued with priority.
    priority: usize,
    processing: bool,
    generation: u64,
    state: Option<SpeechState>,
}

struct Inner {
    backends: SpeechBackends,
    settings: SettingsCell,
    queue: Mutex<Queue>,
    status: watch::Sender<SpeechStatus>,
    stop: Notify,
    events: broadcast::Sender<Event>,
}

/// Handle to the speech engine. Cloning shares the same queue.
///
/// `speak`, `speak_priority` and `stop` must be called from within a Tokio
/// runtime.
#[derive(Clone)]
pub struct SpeechEngine {
    inner: Arc<Inner>,
}

impl SpeechEngine {
    pub fn new(
        backends: SpeechBackends,
        settings: SpeechSettings,
        events: broadcast::Sender<Event>,
    ) -> Self {
        Self::build(backends, SettingsCell::new(settings, None), events)
    }

    /// Settings are loaded from `store` and written back on every update.
    pub fn load(
        backends: SpeechBackends,
        store: Arc<dyn KvStore>,
        events: broadcast::Sender<Event>,
    ) -> Self {
        let settings = SpeechSettings::load(store.as_ref());
        Self::build(backends, SettingsCell::new(settings, Some(store)), events)
    }

    fn build(
        backends: SpeechBackends,
        settings: SettingsCell,
        events: broadcast::Sender<Event>,
    ) -> Self {
        let (status, _) = watch::channel(SpeechStatus {
            state: SpeechState::Idle,
            queued: 0,
        });
        Self {
            inner: Arc::new(Inner {
                backends,
                settings,
                queue: Mutex::new(Queue::default()),
                status,
                stop: Notify::new(),
                events,
            }),
        }
    }

    /// Append `text` to the queue. Fire-and-forget.
    pub fn speak(&self, text: impl Into<String>) {
        self.enqueue(text.into(), false);
    }

    /// Put `text` ahead of the regular backlog, behind the item already
    /// playing and any earlier priority items.
    pub fn speak_priority(&self, text: impl Into<String>) {
        self.enqueue(text.into(), true);
    }

    fn enqueue(&self, text: String, front: bool) {
        if text.trim().is_empty() {
            return;
        }
        let mut queue = self.inner.lock_queue();
        debug!(text = %text, front, "speech queued");
        if front {
            let at = queue.priority;
            queue.items.insert(at, text);
            queue.priority += 1;
        } else {
            queue.items.push_back(text);
        }
        self.inner.publish_queued(&queue);

        if !queue.processing {
            queue.processing = true;
            let generation = queue.generation;
            drop(queue);
            tokio::spawn(Inner::run(self.inner.clone(), generation));
        }
    }

    /// Cancel playback, discard the queue and return to Idle. No-op when idle.
    pub fn stop(&self) {
        let mut queue = self.inner.lock_queue();
        if !queue.processing && queue.items.is_empty() {
            return;
        }
        let discarded = queue.items.len();
        queue.items.clear();
        queue.priority = 0;
        queue.processing = false;
        queue.generation += 1;
        self.inner.set_state(&mut queue, SpeechState::Stopped);
        self.inner.set_state(&mut queue, SpeechState::Idle);
        drop(queue);

        self.inner.stop.notify_waiters();
        info!(discarded, "speech stopped");
    }

    /// Merge `patch` into the settings. Applies from the next queue item.
    pub fn update_settings(
        &self,
        patch: &SpeechSettingsPatch,
    ) -> Result<SpeechSettings, ValidationError> {
        let settings = self.inner.settings.update(patch)?;
        info!(engine = %settings.engine, voice = %settings.voice_name, "speech settings updated");
        Ok(settings)
    }

    pub fn settings(&self) -> SpeechSettings {
        self.inner.settings.get()
    }

    pub fn status(&self) -> SpeechStatus {
        *self.inner.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SpeechStatus> {
        self.inner.status.subscribe()
    }

    pub fn is_speaking(&self) -> bool {
        self.status().state == SpeechState::Speaking
    }

    pub fn is_loading(&self) -> bool {
        self.status().state == SpeechState::Loading
    }

    /// Resolves once the queue is empty and nothing is playing.
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(SpeechStatus::is_idle).await;
    }
}

impl Inner {
    fn lock_queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish_queued(&self, queue: &Queue) {
        let queued = queue.items.len();
        self.status.send_modify(|s| s.queued = queued);
    }

    fn set_state(&self, queue: &mut Queue, state: SpeechState) {
        let queued = queue.items.len();
        self.status.send_replace(SpeechStatus { state, queued });
        if queue.state != Some(state) {
            queue.state = Some(state);
            let _ = self.events.send(Event::SpeechStateChanged { state, queued });
        }
    }

    /// Move to `state` unless `generation` has been stopped.
    fn transition(&self, generation: u64, state: SpeechState) -> bool {
        let mut queue = self.lock_queue();
        if queue.generation != generation {
            return false;
        }
        self.set_state(&mut queue, state);
        true
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock_queue().generation == generation
    }

    fn emit(&self, generation: u64, event: Event) {
        if self.is_current(generation) {
            let _ = self.events.send(event);
        }
    }

    async fn run(self: Arc<Self>, generation: u64) {
        loop {
            let text = {
                let mut queue = self.lock_queue();
                if queue.generation != generation {
                    return;
                }
                // The queued count is republished by the next transition.
                match queue.items.pop_front() {
                    Some(text) => {
                        queue.priority = queue.priority.saturating_sub(1);
                        text
                    }
                    None => {
                        queue.processing = false;
                        self.set_state(&mut queue, SpeechState::Idle);
                        return;
                    }
                }
            };

            let settings = self.settings.get();
            if self.deliver(generation, &text, &settings).await.is_none() {
                debug!(text = %text, "speech cancelled");
                return;
            }
        }
    }

    /// Speak one item, walking the fallback chain. `None` means stopped.
    async fn deliver(&self, generation: u64, text: &str, settings: &SpeechSettings) -> Option<()> {
        let mut engine = settings.engine;
        loop {
            let synthesizer = match engine {
                VoiceEngine::Murf => &self.backends.murf,
                VoiceEngine::ElevenLabs => &self.backends.elevenlabs,
                VoiceEngine::Local => {
                    let spoken = self
                        .until_stopped(
                            generation,
                            SpeechState::Speaking,
                            self.backends.local.speak(text, settings.volume),
                        )
                        .await?;
                    if let Err(err) = spoken {
                        // Terminal engine: the item is dropped quietly.
                        debug!(error = %err, "local synthesis failed");
                        self.dropped(generation, text, &err);
                    }
                    return Some(());
                }
            };

            let voice = settings.voice_for(engine);
            let synthesized = self
                .until_stopped(
                    generation,
                    SpeechState::Loading,
                    synthesizer.synthesize(text, &voice),
                )
                .await?;

            match synthesized {
                Ok(audio) => {
                    let played = self
                        .until_stopped(
                            generation,
                            SpeechState::Speaking,
                            self.backends.output.play(audio, settings.volume),
                        )
                        .await?;
                    if let Err(err) = played {
                        warn!(engine = %engine, error = %err, "playback failed, dropping item");
                        self.dropped(generation, text, &err);
                    }
                    return Some(());
                }
                Err(err) => {
                    let Some(next) = engine.fallback() else {
                        return Some(());
                    };
                    warn!(from = %engine, to = %next, error = %err, "speech engine failed, falling back");
                    self.emit(
                        generation,
                        Event::EngineFallback {
                            from: engine,
                            to: next,
                            reason: err.to_string(),
                        },
                    );
                    engine = next;
                }
            }
        }
    }

    fn dropped(&self, generation: u64, text: &str, err: &SpeechError) {
        self.emit(
            generation,
            Event::SpeechDropped {
                text: text.to_string(),
                reason: err.to_string(),
            },
        );
    }

    /// Enter `state` and drive `fut` until it completes or `stop()` is called.
    async fn until_stopped<F: Future>(
        &self,
        generation: u64,
        state: SpeechState,
        fut: F,
    ) -> Option<F::Output> {
        let stopped = self.stop.notified();
        tokio::pin!(stopped);
        // Register before checking the generation so a concurrent stop is not missed.
        stopped.as_mut().enable();
        if !self.transition(generation, state) {
            return None;
        }
        tokio::select! {
            out = fut => Some(out),
            _ = &mut stopped => None,
        }
    }
}
