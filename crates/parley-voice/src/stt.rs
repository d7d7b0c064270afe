use crate::config::TranscriptionConfig;
use crate::error::{ServiceKind, VoiceError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;

/// Maximum audio input size for STT (25 MiB, the hosted Whisper upload cap).
const MAX_STT_INPUT_BYTES: usize = 25 * 1024 * 1024;

/// Timeout for a transcription request.
const STT_TIMEOUT: Duration = Duration::from_secs(60);

/// Speech-to-text engine.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribes one utterance. `extension` names the container format
    /// (`webm`, `mp4`, `wav`) so the engine can pick a decoder.
    async fn transcribe(&self, audio: &[u8], extension: &str) -> Result<String, VoiceError>;
}

/// Whisper behind an OpenAI-compatible `/audio/transcriptions` endpoint.
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    client: Client,
    config: TranscriptionConfig,
}

impl WhisperTranscriber {
    pub fn new(client: Client, config: TranscriptionConfig) -> Self {
        Self { client, config }
    }

    fn url(&self) -> String {
        format!(
            "{}/audio/transcriptions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &[u8], extension: &str) -> Result<String, VoiceError> {
        if audio.len() > MAX_STT_INPUT_BYTES {
            return Err(VoiceError::unavailable(
                ServiceKind::Transcription,
                format!(
                    "audio data exceeds maximum size: {} bytes (limit: {} bytes)",
                    audio.len(),
                    MAX_STT_INPUT_BYTES
                ),
            ));
        }

        // A generic file name; the extension is what the engine keys on.
        let part = Part::bytes(audio.to_vec()).file_name(format!("audio.{}", extension));
        let form = Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("response_format", "text")
            .text("temperature", "0")
            .text("language", self.config.language.clone());

        let response = self
            .client
            .post(self.url())
            .bearer_auth(&self.config.api_key)
            .timeout(STT_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::from_request(ServiceKind::Transcription, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::unavailable(
                ServiceKind::Transcription,
                format!("HTTP {}: {}", status, body),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| VoiceError::invalid(ServiceKind::Transcription, e.to_string()))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(VoiceError::invalid(
                ServiceKind::Transcription,
                "no speech was recognised",
            ));
        }

        Ok(text.to_string())
    }
}
