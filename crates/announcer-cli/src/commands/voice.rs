use clap::Subcommand;

use announcer_core::speech::{voices_for, SpeechSettings, SpeechSettingsPatch, VoiceEngine};

use super::{open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum VoiceAction {
    /// Print the current speech settings
    Show,
    /// List built-in voices for an engine (defaults to the configured one)
    List {
        #[arg(long)]
        engine: Option<VoiceEngine>,
    },
    /// Change engine, voice or volume
    Set {
        /// murf, elevenlabs or local
        #[arg(long)]
        engine: Option<VoiceEngine>,
        /// Voice id from `voice list`
        #[arg(long)]
        voice: Option<String>,
        /// Playback volume, 0.0 to 1.0
        #[arg(long)]
        volume: Option<f32>,
    },
}

pub fn run(action: VoiceAction) -> CliResult {
    let store = open_store()?;
    let settings = SpeechSettings::load(store.as_ref());

    match action {
        VoiceAction::Show => print_json(&settings),
        VoiceAction::List { engine } => {
            print_json(voices_for(engine.unwrap_or(settings.engine)))
        }
        VoiceAction::Set {
            engine,
            voice,
            volume,
        } => {
            let target = engine.unwrap_or(settings.engine);
            let voice_name = match &voice {
                Some(id) => Some(
                    voices_for(target)
                        .iter()
                        .find(|v| v.id == id.as_str())
                        .map(|v| v.name.to_string())
                        .ok_or_else(|| format!("unknown voice '{id}' for {target}"))?,
                ),
                None => None,
            };
            let patch = SpeechSettingsPatch {
                engine,
                voice_id: voice,
                voice_name,
                volume,
            };
            let next = settings.merged(&patch)?;
            next.save(store.as_ref());
            print_json(&next)
        }
    }
}
