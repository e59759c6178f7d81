use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::storage::database::SPEECH_SETTINGS_KEY;
use crate::storage::{load_json, save_json, KvStore};

/// Speech backends, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceEngine {
    /// Primary remote vendor.
    Murf,
    /// Secondary remote vendor.
    #[serde(alias = "eleven_labs")]
    ElevenLabs,
    /// On-device synthesis. Always available.
    #[serde(alias = "webspeech")]
    Local,
}

impl VoiceEngine {
    /// The engine to try when this one fails.
    pub fn fallback(self) -> Option<VoiceEngine> {
        match self {
            VoiceEngine::Murf => Some(VoiceEngine::ElevenLabs),
            VoiceEngine::ElevenLabs => Some(VoiceEngine::Local),
            VoiceEngine::Local => None,
        }
    }
}

impl std::fmt::Display for VoiceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            VoiceEngine::Murf => "murf",
            VoiceEngine::ElevenLabs => "elevenlabs",
            VoiceEngine::Local => "local",
        })
    }
}

impl std::str::FromStr for VoiceEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "murf" => Ok(VoiceEngine::Murf),
            "elevenlabs" | "eleven_labs" => Ok(VoiceEngine::ElevenLabs),
            "local" | "webspeech" => Ok(VoiceEngine::Local),
            other => Err(format!("unknown engine '{other}' (murf, elevenlabs, local)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Voice {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const MURF_VOICES: &[Voice] = &[
    Voice { id: "pt-BR-leila", name: "Leila", description: "Feminina, brasileira, profissional" },
    Voice { id: "pt-BR-marcos", name: "Marcos", description: "Masculino, brasileiro, claro" },
    Voice { id: "pt-BR-rafaela", name: "Rafaela", description: "Feminina, brasileira, amigável" },
    Voice { id: "pt-BR-rodrigo", name: "Rodrigo", description: "Masculino, brasileiro, natural" },
];

pub const ELEVENLABS_VOICES: &[Voice] = &[
    Voice { id: "XrExE9yKIg1WjnnlVkGX", name: "Matilda", description: "Feminina, acolhedora e amigável" },
    Voice { id: "EXAVITQu4vr4xnSDxMaL", name: "Sarah", description: "Feminina, clara e profissional" },
    Voice { id: "pFZP5JQG7iQjIQuC4Bku", name: "Lily", description: "Feminina, suave e gentil" },
    Voice { id: "JBFqnCBsd6RMkjVDRZzb", name: "George", description: "Masculino, profissional" },
    Voice { id: "nPczCjzI2devNBz1zQrb", name: "Brian", description: "Masculino, autoritário" },
    Voice { id: "onwK4e9ZLuTAKqWW03F9", name: "Daniel", description: "Masculino, voz grave" },
];

/// Persisted voice preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechSettings {
    pub engine: VoiceEngine,
    pub voice_id: String,
    pub voice_name: String,
    pub volume: f32,
}

/// Partial settings change. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechSettingsPatch {
    pub engine: Option<VoiceEngine>,
    pub voice_id: Option<String>,
    pub voice_name: Option<String>,
    pub volume: Option<f32>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        let voice = MURF_VOICES[0];
        Self {
            engine: VoiceEngine::Murf,
            voice_id: voice.id.into(),
            voice_name: voice.name.into(),
            volume: 1.0,
        }
    }
}

impl SpeechSettings {
    /// Load from `store`, defaults when absent or malformed.
    pub fn load(store: &dyn KvStore) -> Self {
        load_json::<SpeechSettings>(store, SPEECH_SETTINGS_KEY)
            .filter(|s| (0.0..=1.0).contains(&s.volume))
            .unwrap_or_default()
    }

    pub fn save(&self, store: &dyn KvStore) {
        save_json(store, SPEECH_SETTINGS_KEY, self);
    }

    /// Apply `patch`. Switching engine without naming a voice selects the new
    /// engine's default voice, since voice ids are vendor-specific.
    pub fn merged(&self, patch: &SpeechSettingsPatch) -> Result<Self, ValidationError> {
        let mut next = self.clone();
        if let Some(engine) = patch.engine {
            if engine != self.engine && patch.voice_id.is_none() {
                let (id, name) = voices_for(engine)
                    .first()
                    .map(|v| (v.id.to_string(), v.name.to_string()))
                    .unwrap_or_default();
                next.voice_id = id;
                next.voice_name = name;
            }
            next.engine = engine;
        }
        if let Some(voice_id) = &patch.voice_id {
            next.voice_id = voice_id.clone();
        }
        if let Some(voice_name) = &patch.voice_name {
            next.voice_name = voice_name.clone();
        }
        if let Some(volume) = patch.volume {
            if !(0.0..=1.0).contains(&volume) {
                return Err(ValidationError::InvalidVolume(volume));
            }
            next.volume = volume;
        }
        Ok(next)
    }

    /// Built-in voices for the configured engine. Local voices come from the
    /// platform and are not listed here.
    pub fn voices_for_engine(&self) -> &'static [Voice] {
        voices_for(self.engine)
    }

    /// Voice id to send to `engine`. A remote engine reached through fallback
    /// uses its own default voice, since the configured id belongs to another
    /// vendor.
    pub fn voice_for(&self, engine: VoiceEngine) -> String {
        if engine == self.engine {
            return self.voice_id.clone();
        }
        voices_for(engine)
            .first()
            .map(|v| v.id.to_string())
            .unwrap_or_default()
    }
}

pub fn voices_for(engine: VoiceEngine) -> &'static [Voice] {
    match engine {
        VoiceEngine::Murf => MURF_VOICES,
        VoiceEngine::ElevenLabs => ELEVENLABS_VOICES,
        VoiceEngine::Local => &[],
    }
}

/// Settings shared between the engine handle and its worker.
pub(crate) struct SettingsCell {
    current: std::sync::Mutex<SpeechSettings>,
    store: Option<Arc<dyn KvStore>>,
}

impl SettingsCell {
    pub(crate) fn new(settings: SpeechSettings, store: Option<Arc<dyn KvStore>>) -> Self {
        Self {
            current: std::sync::Mutex::new(settings),
            store,
        }
    }

    pub(crate) fn get(&self) -> SpeechSettings {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn update(
        &self,
        patch: &SpeechSettingsPatch,
    ) -> Result<SpeechSettings, ValidationError> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let next = current.merged(patch)?;
        *current = next.clone();
        if let Some(store) = &self.store {
            next.save(store.as_ref());
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn fallback_chain() {
        assert_eq!(VoiceEngine::Murf.fallback(), Some(VoiceEngine::ElevenLabs));
        assert_eq!(VoiceEngine::ElevenLabs.fallback(), Some(VoiceEngine::Local));
        assert_eq!(VoiceEngine::Local.fallback(), None);
    }

    #[test]
    fn engine_names_parse_and_serialize() {
        assert_eq!("webspeech".parse::<VoiceEngine>().unwrap(), VoiceEngine::Local);
        assert_eq!("ElevenLabs".parse::<VoiceEngine>().unwrap(), VoiceEngine::ElevenLabs);
        assert!("espeak".parse::<VoiceEngine>().is_err());
        assert_eq!(serde_json::to_string(&VoiceEngine::Murf).unwrap(), "\"murf\"");
        let legacy: VoiceEngine = serde_json::from_str("\"webspeech\"").unwrap();
        assert_eq!(legacy, VoiceEngine::Local);
    }

    #[test]
    fn merge_validates_volume() {
        let settings = SpeechSettings::default();
        let patch = SpeechSettingsPatch {
            volume: Some(1.5),
            ..Default::default()
        };
        assert_eq!(settings.merged(&patch), Err(ValidationError::InvalidVolume(1.5)));

        let patch = SpeechSettingsPatch {
            engine: Some(VoiceEngine::Local),
            volume: Some(0.4),
            ..Default::default()
        };
        let merged = settings.merged(&patch).unwrap();
        assert_eq!(merged.engine, VoiceEngine::Local);
        assert_eq!(merged.volume, 0.4);
    }

    #[test]
    fn switching_engine_picks_that_engines_default_voice() {
        let settings = SpeechSettings::default();
        let patch = SpeechSettingsPatch {
            engine: Some(VoiceEngine::ElevenLabs),
            ..Default::default()
        };
        let merged = settings.merged(&patch).unwrap();
        assert_eq!(merged.voice_id, "XrExE9yKIg1WjnnlVkGX");
        assert_eq!(merged.voice_name, "Matilda");
        assert!(ELEVENLABS_VOICES
            .iter()
            .any(|v| v.id == merged.voice_for(VoiceEngine::ElevenLabs)));

        let local = settings
            .merged(&SpeechSettingsPatch {
                engine: Some(VoiceEngine::Local),
                ..Default::default()
            })
            .unwrap();
        assert!(local.voice_id.is_empty());

        // Same engine, or an explicit voice, keeps what was asked for.
        let same = settings
            .merged(&SpeechSettingsPatch {
                engine: Some(VoiceEngine::Murf),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(same.voice_id, "pt-BR-leila");
        let explicit = settings
            .merged(&SpeechSettingsPatch {
                engine: Some(VoiceEngine::ElevenLabs),
                voice_id: Some("JBFqnCBsd6RMkjVDRZzb".into()),
                voice_name: Some("George".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(explicit.voice_id, "JBFqnCBsd6RMkjVDRZzb");
    }

    #[test]
    fn fallback_engine_uses_its_own_voice() {
        let settings = SpeechSettings::default();
        assert_eq!(settings.voice_for(VoiceEngine::Murf), "pt-BR-leila");
        assert_eq!(settings.voice_for(VoiceEngine::ElevenLabs), "XrExE9yKIg1WjnnlVkGX");

        let direct = SpeechSettings {
            engine: VoiceEngine::ElevenLabs,
            voice_id: "onwK4e9ZLuTAKqWW03F9".into(),
            voice_name: "Daniel".into(),
            volume: 1.0,
        };
        assert_eq!(direct.voice_for(VoiceEngine::ElevenLabs), "onwK4e9ZLuTAKqWW03F9");
        assert_eq!(direct.voices_for_engine().len(), 6);
    }

    #[test]
    fn settings_persist_through_cell() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let cell = SettingsCell::new(SpeechSettings::load(store.as_ref()), Some(store.clone()));
        cell.update(&SpeechSettingsPatch {
            volume: Some(0.7),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(SpeechSettings::load(store.as_ref()).volume, 0.7);
    }

    #[test]
    fn corrupt_settings_fall_back() {
        let store = MemoryStore::new();
        store.kv_set(SPEECH_SETTINGS_KEY, "[1,2,3]").unwrap();
        assert_eq!(SpeechSettings::load(&store), SpeechSettings::default());
    }
}
