//! On-device synthesis through an espeak-compatible command.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::SpeechError;
use crate::storage::LocalVoiceConfig;

/// Speaks text directly on the local audio device.
///
/// Dropping the returned future cancels the utterance.
#[async_trait]
pub trait LocalSynthesizer: Send + Sync {
    async fn speak(&self, text: &str, volume: f32) -> Result<(), SpeechError>;
}

pub struct EspeakSynthesizer {
    command: String,
    language: String,
    rate: f32,
    pitch: f32,
    voice: OnceCell<Option<String>>,
}

impl EspeakSynthesizer {
    pub fn new(config: &LocalVoiceConfig) -> Self {
        Self {
            command: config.command.clone(),
            language: config.language.clone(),
            rate: config.rate,
            pitch: config.pitch,
            voice: OnceCell::new(),
        }
    }

    /// Resolved once, on first use.
    async fn voice(&self) -> Option<String> {
        self.voice
            .get_or_init(|| async {
                let output = Command::new(&self.command)
                    .arg("--voices")
                    .stdin(Stdio::null())
                    .stderr(Stdio::null())
                    .output()
                    .await;
                match output {
                    Ok(out) if out.status.success() => {
                        let voice = pick_voice(&String::from_utf8_lossy(&out.stdout), &self.language);
                        debug!(language = %self.language, ?voice, "local voice selected");
                        voice
                    }
                    Ok(_) | Err(_) => {
                        warn!(command = %self.command, "could not list local voices, using default");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    fn args(&self, voice: Option<&str>, volume: f32) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(voice) = voice {
            args.push("-v".to_string());
            args.push(voice.to_string());
        }
        // espeak: words per minute (default 175), pitch 0-99 (default 50),
        // amplitude 0-200 (default 100).
        let speed = (175.0 * self.rate).round().clamp(80.0, 450.0) as u32;
        let pitch = (50.0 * self.pitch).round().clamp(0.0, 99.0) as u32;
        let amplitude = (100.0 * volume).round().clamp(0.0, 200.0) as u32;
        args.extend([
            "-s".to_string(),
            speed.to_string(),
            "-p".to_string(),
            pitch.to_string(),
            "-a".to_string(),
            amplitude.to_string(),
        ]);
        args
    }
}

#[async_trait]
impl LocalSynthesizer for EspeakSynthesizer {
    async fn speak(&self, text: &str, volume: f32) -> Result<(), SpeechError> {
        let voice = self.voice().await;
        let status = Command::new(&self.command)
            .args(self.args(voice.as_deref(), volume))
            .arg("--")
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| SpeechError::Synthesis(format!("{}: {e}", self.command)))?;

        if status.success() {
            Ok(())
        } else {
            Err(SpeechError::Synthesis(format!("{} exited with {status}", self.command)))
        }
    }
}

/// Pick a voice from `espeak --voices` output whose language tag belongs to
/// `language`'s family. An exact tag wins over a regional variant.
pub fn pick_voice(listing: &str, language: &str) -> Option<String> {
    let family = language.to_ascii_lowercase();
    let tags: Vec<&str> = listing
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .collect();

    tags.iter()
        .find(|tag| tag.eq_ignore_ascii_case(&family))
        .or_else(|| {
            tags.iter().find(|tag| {
                let tag = tag.to_ascii_lowercase();
                tag.strip_prefix(&family)
                    .is_some_and(|rest| rest.starts_with('-') || rest.starts_with('_'))
            })
        })
        .map(|tag| tag.to_string())
}
