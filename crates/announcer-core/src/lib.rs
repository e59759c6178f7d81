//! # Announcer Core Library
//!
//! Scheduling and speech delivery for a public announcement display. Rotating
//! messages, fixed closing-time notices and an optional hourly chime are spoken
//! over a background media stream, which is ducked while speech plays.
//!
//! ## Architecture
//!
//! - **Schedulers**: caller-ticked state machines. `tick(now)` returns the
//!   announcements that are due; they never read the clock or speak directly.
//! - **Speech**: a serialized queue over three engines with automatic fallback
//!   (primary remote, secondary remote, local synthesis).
//! - **Station**: owns every component, reads the clock, routes announcements
//!   to the speech engine and brackets media ducking.
//! - **Storage**: SQLite key/value blobs and TOML configuration.
//!
//! ## Key Components
//!
//! - [`RecurringScheduler`]: interval timers with message rotation
//! - [`ClosingAnnouncer`]: once-per-day closing announcements
//! - [`SpeechEngine`]: speech queue and engine fallback
//! - [`DuckingCoordinator`]: media volume bracket
//! - [`Station`]: wiring and run loop

pub mod clock;
pub mod closing;
pub mod ducking;
pub mod error;
pub mod events;
pub mod hourly;
pub mod speech;
pub mod station;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use closing::{ClosingAnnouncement, ClosingAnnouncer, ClosingSchedule};
pub use ducking::{DuckingCoordinator, MediaVolume, SharedVolume};
pub use error::{ConfigError, CoreError, DatabaseError, SpeechError, ValidationError};
pub use events::{Announcement, AnnouncementSource, Event};
pub use hourly::HourlyChime;
pub use speech::{SpeechBackends, SpeechEngine, SpeechSettings, SpeechState, VoiceEngine};
pub use station::{LastAnnouncement, Station};
pub use storage::{Config, Database, KvStore, MemoryStore};
pub use timer::{RecurringScheduler, TimerConfig, TimerPatch, TimerState};
