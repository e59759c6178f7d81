//! Remote synthesis over HTTP.
//!
//! Both vendors sit behind endpoints sharing one request/response shape:
//! `POST {text, voiceId}` answered by `{success, audioContent, error}` where
//! `audioContent` is base64-encoded audio.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SpeechError;

/// Text in, encoded audio out.
#[async_trait]
pub trait RemoteSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, SpeechError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    audio_content: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct HttpSynthesizer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpSynthesizer {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        api_key: Option<String>,
    ) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpeechError::Network(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl RemoteSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, SpeechError> {
        if self.endpoint.is_empty() {
            return Err(SpeechError::Network("endpoint not configured".into()));
        }

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&SynthesisRequest { text, voice_id });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SpeechError::Http {
                status: status.as_u16(),
            });
        }

        let body: SynthesisResponse = resp
            .json()
            .await
            .map_err(|e| SpeechError::Decode(e.to_string()))?;
        if !body.success {
            return Err(SpeechError::Rejected(
                body.error.unwrap_or_else(|| "unknown error".into()),
            ));
        }

        let encoded = body
            .audio_content
            .filter(|s| !s.is_empty())
            .ok_or(SpeechError::EmptyPayload)?;
        let audio = STANDARD.decode(encoded.trim())?;
        if audio.is_empty() {
            return Err(SpeechError::EmptyPayload);
        }
        debug!(endpoint = %self.endpoint, bytes = audio.len(), "synthesized");
        Ok(audio)
    }
}
