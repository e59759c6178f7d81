//! Audio playback for remote synthesis results.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::SpeechError;
use crate::storage::PlayerConfig;

/// Plays an encoded audio payload to completion.
///
/// Dropping the returned future stops playback.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(&self, audio: Vec<u8>, volume: f32) -> Result<(), SpeechError>;
}

/// Pipes audio into an external player process (ffplay by default).
pub struct CommandPlayer {
    command: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    fn args(&self, volume: f32) -> Vec<String> {
        let volume = ((volume.clamp(0.0, 1.0) * 100.0).round() as u32).to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{volume}", &volume))
            .collect()
    }
}

#[async_trait]
impl AudioOutput for CommandPlayer {
    async fn play(&self, audio: Vec<u8>, volume: f32) -> Result<(), SpeechError> {
        let mut child = Command::new(&self.command)
            .args(self.args(volume))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpeechError::Playback(format!("{}: {e}", self.command)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&audio)
                .await
                .map_err(|e| SpeechError::Playback(e.to_string()))?;
            // EOF lets the player finish.
            drop(stdin);
        }

        let status = child
            .wait()
            .await
            .map_err(|e| SpeechError::Playback(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(SpeechError::Playback(format!("{} exited with {status}", self.command)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_placeholder_is_substituted() {
        let player = CommandPlayer::new(&PlayerConfig {
            command: "ffplay".into(),
            args: vec!["-volume".into(), "{volume}".into(), "-".into()],
        });
        assert_eq!(player.args(0.35), vec!["-volume", "35", "-"]);
        assert_eq!(player.args(3.0), vec!["-volume", "100", "-"]);
    }

    #[tokio::test]
    async fn missing_player_is_playback_error() {
        let player = CommandPlayer::new(&PlayerConfig {
            command: "announcer-no-such-player".into(),
            args: vec![],
        });
        let err = player.play(vec![1, 2, 3], 1.0).await.unwrap_err();
        assert!(matches!(err, SpeechError::Playback(_)));
    }
}
