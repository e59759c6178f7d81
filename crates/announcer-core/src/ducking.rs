//! Media volume ducking around announcements.
//!
//! The coordinator is edge-triggered: `on_announcement_start` lowers the
//! background media multiplier and `on_announcement_end` restores it. It
//! never looks at audio; the call site decides where the bracket ends.

use std::sync::{Arc, Mutex};

use tracing::debug;

/// Anything whose volume can be scaled by a multiplier in `0.0..=1.0`.
pub trait MediaVolume: Send + Sync {
    fn set_volume_multiplier(&self, multiplier: f32);
}

/// A multiplier cell shared with whatever renders the media stream.
#[derive(Debug, Clone)]
pub struct SharedVolume {
    multiplier: Arc<Mutex<f32>>,
}

impl SharedVolume {
    pub fn new() -> Self {
        Self {
            multiplier: Arc::new(Mutex::new(1.0)),
        }
    }

    pub fn get(&self) -> f32 {
        *self.multiplier.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SharedVolume {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaVolume for SharedVolume {
    fn set_volume_multiplier(&self, multiplier: f32) {
        *self.multiplier.lock().unwrap_or_else(|e| e.into_inner()) = multiplier;
    }
}

pub struct DuckingCoordinator {
    sink: Arc<dyn MediaVolume>,
    duck_level: f32,
    current: f32,
}

impl DuckingCoordinator {
    pub const FULL: f32 = 1.0;

    pub fn new(sink: Arc<dyn MediaVolume>, duck_level: f32) -> Self {
        Self {
            sink,
            duck_level: duck_level.clamp(0.0, 1.0),
            current: Self::FULL,
        }
    }

    pub fn multiplier(&self) -> f32 {
        self.current
    }

    pub fn is_ducked(&self) -> bool {
        self.current < Self::FULL
    }

    pub fn on_announcement_start(&mut self) {
        self.apply(self.duck_level);
    }

    pub fn on_announcement_end(&mut self) {
        self.apply(Self::FULL);
    }

    fn apply(&mut self, multiplier: f32) {
        debug!(multiplier, "media volume multiplier");
        self.current = multiplier;
        self.sink.set_volume_multiplier(multiplier);
    }
}
