//! Speech delivery: settings, backends and the serialized queue.

mod engine;
mod local;
mod playback;
mod remote;
mod settings;

pub use engine::{SpeechEngine, SpeechState, SpeechStatus};
pub use local::{pick_voice, EspeakSynthesizer, LocalSynthesizer};
pub use playback::{AudioOutput, CommandPlayer};
pub use remote::{HttpSynthesizer, RemoteSynthesizer};
pub use settings::{
    voices_for, SpeechSettings, SpeechSettingsPatch, Voice, VoiceEngine, ELEVENLABS_VOICES,
    MURF_VOICES,
};

use std::sync::Arc;
use std::time::Duration;

use crate::error::SpeechError;
use crate::storage::Config;

/// The concrete engines behind a [`SpeechEngine`].
pub struct SpeechBackends {
    pub murf: Arc<dyn RemoteSynthesizer>,
    pub elevenlabs: Arc<dyn RemoteSynthesizer>,
    pub local: Arc<dyn LocalSynthesizer>,
    pub output: Arc<dyn AudioOutput>,
}

impl SpeechBackends {
    /// HTTP synthesizers, espeak and the command player, as configured.
    pub fn from_config(config: &Config, api_key: Option<String>) -> Result<Self, SpeechError> {
        let timeout = Duration::from_secs(config.remote.timeout_secs);
        Ok(Self {
            murf: Arc::new(HttpSynthesizer::new(
                config.remote.primary_url.clone(),
                timeout,
                api_key.clone(),
            )?),
            elevenlabs: Arc::new(HttpSynthesizer::new(
                config.remote.secondary_url.clone(),
                timeout,
                api_key,
            )?),
            local: Arc::new(EspeakSynthesizer::new(&config.local)),
            output: Arc::new(CommandPlayer::new(&config.player)),
        })
    }
}
