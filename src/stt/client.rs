//! Transcription service adapter.
//!
//! [`WhisperHttpClient`] uploads WAV bytes to any OpenAI-compatible
//! `/v1/audio/transcriptions` endpoint and returns the recognized text.
//! All connection details come from [`AgentConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::AgentConfig;

// ---------------------------------------------------------------------------
// TranscribeError
// ---------------------------------------------------------------------------

/// Errors that can occur during transcription.
///
/// [`NoSpeech`](TranscribeError::NoSpeech) is kept separate from the
/// transport/API variants: the service worked but heard nothing, which is a
/// capture-quality signal, not a service fault. Upstream both take the same
/// text-input fallback path.
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// HTTP transport or connection error.
    #[error("transcription request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("transcription request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("transcription API error {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body could not be parsed.
    #[error("failed to parse transcription response: {0}")]
    Parse(String),

    /// The service succeeded but detected no usable speech.
    #[error("no speech detected in recording")]
    NoSpeech,
}

impl From<reqwest::Error> for TranscribeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranscribeError::Timeout
        } else {
            TranscribeError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriptionClient trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to a speech-to-text service.
#[async_trait]
pub trait TranscriptionClient: Send + Sync {
    /// Transcribe a mono 16-bit WAV payload.
    async fn transcribe(&self, wav: &[u8]) -> Result<String, TranscribeError>;
}

// ---------------------------------------------------------------------------
// WhisperHttpClient
// ---------------------------------------------------------------------------

/// Response shape of the transcriptions endpoint.
#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Calls an OpenAI-compatible `/v1/audio/transcriptions` endpoint.
pub struct WhisperHttpClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl WhisperHttpClient {
    /// Build a client from session config. The per-request timeout comes
    /// from `config.request_timeout_secs`; a default client is the
    /// last-resort fallback if the builder fails.
    pub fn from_config(config: &AgentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.transcription_model.clone(),
        }
    }
}

#[async_trait]
impl TranscriptionClient for WhisperHttpClient {
    async fn transcribe(&self, wav: &[u8]) -> Result<String, TranscribeError> {
        log::info!("Transcribing {} bytes with {}.", wav.len(), self.model);

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| TranscribeError::Request(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let url = format!("{}/v1/audio/transcriptions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::Parse(e.to_string()))?;

        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(TranscribeError::NoSpeech);
        }

        log::info!("Transcript: {text}");
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;

    fn make_config() -> AgentConfig {
        AgentConfig::from_lookup(|name| match name {
            "OPENAI_API_KEY" => Some("sk-test".into()),
            _ => None,
        })
        .expect("config")
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _client = WhisperHttpClient::from_config(&make_config());
    }

    /// `WhisperHttpClient` must be usable as `dyn TranscriptionClient`.
    #[test]
    fn client_is_object_safe() {
        let client: Box<dyn TranscriptionClient> =
            Box::new(WhisperHttpClient::from_config(&make_config()));
        drop(client);
    }

    #[test]
    fn response_shape_deserializes() {
        let parsed: TranscriptionResponse =
            serde_json::from_str(r#"{"text": "hello there"}"#).expect("parse");
        assert_eq!(parsed.text, "hello there");
    }

    #[test]
    fn timeout_maps_to_its_own_variant() {
        // reqwest::Error cannot be constructed directly; verify the mapping
        // contract through the Display side instead.
        let err = TranscribeError::Timeout;
        assert_eq!(err.to_string(), "transcription request timed out");

        let err = TranscribeError::NoSpeech;
        assert_eq!(err.to_string(), "no speech detected in recording");
    }
}
