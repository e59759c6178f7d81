//! Integration tests for speech delivery: the queue, the engine fallback
//! chain against mocked HTTP endpoints, and the station's ducking bracket.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use announcer_core::clock::ManualClock;
use announcer_core::ducking::SharedVolume;
use announcer_core::speech::{
    AudioOutput, HttpSynthesizer, LocalSynthesizer, RemoteSynthesizer, SpeechBackends,
    SpeechEngine, SpeechSettings, SpeechState, VoiceEngine,
};
use announcer_core::storage::{Config, MemoryStore};
use announcer_core::{Event, SpeechError, Station};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::NaiveDate;
use serde_json::json;
use tokio::sync::broadcast;

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Default)]
struct Recorder {
    entries: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

struct RecordingOutput(Arc<Recorder>);

#[async_trait]
impl AudioOutput for RecordingOutput {
    async fn play(&self, audio: Vec<u8>, volume: f32) -> Result<(), SpeechError> {
        self.0
            .push(format!("play:{}@{volume}", String::from_utf8_lossy(&audio)));
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(())
    }
}

struct RecordingLocal(Arc<Recorder>);

#[async_trait]
impl LocalSynthesizer for RecordingLocal {
    async fn speak(&self, text: &str, _volume: f32) -> Result<(), SpeechError> {
        self.0.push(format!("local:{text}"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(())
    }
}

struct Unreachable;

#[async_trait]
impl RemoteSynthesizer for Unreachable {
    async fn synthesize(&self, _text: &str, _voice_id: &str) -> Result<Vec<u8>, SpeechError> {
        Err(SpeechError::Network("connection refused".into()))
    }
}

fn offline_backends(recorder: &Arc<Recorder>) -> SpeechBackends {
    SpeechBackends {
        murf: Arc::new(Unreachable),
        elevenlabs: Arc::new(Unreachable),
        local: Arc::new(RecordingLocal(recorder.clone())),
        output: Arc::new(RecordingOutput(recorder.clone())),
    }
}

// ============================================================================
// Fallback chain over HTTP
// ============================================================================

#[tokio::test]
async fn test_primary_failure_falls_back_to_secondary_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let primary = server
        .mock("POST", "/primary")
        .with_status(500)
        .create_async()
        .await;
    let secondary = server
        .mock("POST", "/secondary")
        .match_body(mockito::Matcher::PartialJson(
            json!({"voiceId": "XrExE9yKIg1WjnnlVkGX"}),
        ))
        .with_status(200)
        .with_body(json!({"success": true, "audioContent": STANDARD.encode("mp3")}).to_string())
        .create_async()
        .await;

    let recorder = Arc::new(Recorder::default());
    let timeout = Duration::from_secs(5);
    let backends = SpeechBackends {
        murf: Arc::new(
            HttpSynthesizer::new(format!("{}/primary", server.url()), timeout, None).unwrap(),
        ),
        elevenlabs: Arc::new(
            HttpSynthesizer::new(format!("{}/secondary", server.url()), timeout, None).unwrap(),
        ),
        local: Arc::new(RecordingLocal(recorder.clone())),
        output: Arc::new(RecordingOutput(recorder.clone())),
    };
    let settings = SpeechSettings {
        volume: 0.5,
        ..SpeechSettings::default()
    };
    let (tx, mut rx) = broadcast::channel(32);
    let engine = SpeechEngine::new(backends, settings, tx);

    engine.speak("Atenção");
    engine.wait_idle().await;

    primary.assert_async().await;
    secondary.assert_async().await;
    assert_eq!(recorder.entries(), vec!["play:mp3@0.5"]);

    let mut fallbacks = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let Event::EngineFallback { from, to, .. } = event {
            fallbacks.push((from, to));
        }
    }
    assert_eq!(fallbacks, vec![(VoiceEngine::Murf, VoiceEngine::ElevenLabs)]);
}

#[tokio::test]
async fn test_both_remotes_down_uses_local() {
    let mut server = mockito::Server::new_async().await;
    let _primary = server
        .mock("POST", "/primary")
        .with_status(200)
        .with_body(json!({"success": false, "error": "bad voice"}).to_string())
        .create_async()
        .await;
    let _secondary = server
        .mock("POST", "/secondary")
        .with_status(200)
        .with_body(json!({"success": true}).to_string())
        .create_async()
        .await;

    let recorder = Arc::new(Recorder::default());
    let timeout = Duration::from_secs(5);
    let backends = SpeechBackends {
        murf: Arc::new(
            HttpSynthesizer::new(format!("{}/primary", server.url()), timeout, None).unwrap(),
        ),
        elevenlabs: Arc::new(
            HttpSynthesizer::new(format!("{}/secondary", server.url()), timeout, None).unwrap(),
        ),
        local: Arc::new(RecordingLocal(recorder.clone())),
        output: Arc::new(RecordingOutput(recorder.clone())),
    };
    let (tx, _rx) = broadcast::channel(32);
    let engine = SpeechEngine::new(backends, SpeechSettings::default(), tx);

    engine.speak("fallback");
    engine.wait_idle().await;
    assert_eq!(recorder.entries(), vec!["local:fallback"]);
}

// ============================================================================
// Queue semantics
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_single_flight_while_speaking() {
    let recorder = Arc::new(Recorder::default());
    let (tx, _rx) = broadcast::channel(32);
    let settings = SpeechSettings {
        engine: VoiceEngine::Local,
        ..SpeechSettings::default()
    };
    let engine = SpeechEngine::new(offline_backends(&recorder), settings, tx);

    engine.speak("um");
    let mut status = engine.subscribe();
    status
        .wait_for(|s| s.state == SpeechState::Speaking)
        .await
        .unwrap();
    engine.speak("dois");

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(recorder.entries(), vec!["local:um"]);
    assert_eq!(engine.status().queued, 1);

    engine.wait_idle().await;
    assert_eq!(recorder.entries(), vec!["local:um", "local:dois"]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_clears_queue() {
    let recorder = Arc::new(Recorder::default());
    let (tx, _rx) = broadcast::channel(32);
    let settings = SpeechSettings {
        engine: VoiceEngine::Local,
        ..SpeechSettings::default()
    };
    let engine = SpeechEngine::new(offline_backends(&recorder), settings, tx);

    engine.speak("a");
    engine.speak("b");
    engine.stop();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert!(recorder.entries().is_empty());
    assert!(!engine.is_speaking());
    assert!(!engine.is_loading());
}

// ============================================================================
// Station wiring
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_station_brackets_ducking_around_a_burst() {
    let clock = ManualClock::new(
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(21, 44, 59)
            .unwrap(),
    );
    let recorder = Arc::new(Recorder::default());
    let volume = SharedVolume::new();
    let mut station = Station::open(
        &Config::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(clock.clone()),
        offline_backends(&recorder),
        Arc::new(volume.clone()),
    )
    .unwrap();
    let mut events = station.subscribe();

    station.start_timers();
    station.trigger_timer("ads").unwrap();
    clock.set(
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(21, 45, 0)
            .unwrap(),
    );
    station.tick();
    assert_eq!(volume.get(), 0.2);

    station.speech().wait_idle().await;
    station.tick();
    assert_eq!(volume.get(), 1.0);

    let spoken = recorder.entries();
    assert_eq!(spoken.len(), 2);
    assert!(spoken[1].contains("15 minutos"));

    let mut multipliers = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let Event::DuckingChanged { multiplier } = event {
            multipliers.push(multiplier);
        }
    }
    assert_eq!(multipliers, vec![0.2, 1.0]);
}
