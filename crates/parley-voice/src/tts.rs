use crate::config::{RetryPolicy, SynthesisConfig};
use crate::error::{ServiceKind, VoiceError};
use crate::tone;
use async_trait::async_trait;
use parley_types::VoiceProfile;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, warn};

/// Maximum text input size for TTS (64 KiB). Prevents resource exhaustion from
/// oversized synthesis requests.
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Timeout for a single synthesis request.
const TTS_TIMEOUT: Duration = Duration::from_secs(30);

/// Text-to-speech engine.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Renders `text` with the given voice and speaking rate. Returns encoded
    /// audio (MP3 for the HTTP engine).
    async fn synthesize(&self, text: &str, profile: &VoiceProfile) -> Result<Vec<u8>, VoiceError>;
}

/// OpenAI-compatible `/audio/speech` endpoint.
#[derive(Debug, Clone)]
pub struct SpeechEndpoint {
    client: Client,
    config: SynthesisConfig,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'static str,
}

impl SpeechEndpoint {
    pub fn new(client: Client, config: SynthesisConfig) -> Self {
        Self { client, config }
    }

    fn url(&self) -> String {
        format!("{}/audio/speech", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SpeechSynthesizer for SpeechEndpoint {
    async fn synthesize(&self, text: &str, profile: &VoiceProfile) -> Result<Vec<u8>, VoiceError> {
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(VoiceError::unavailable(
                ServiceKind::Synthesis,
                format!(
                    "text exceeds maximum size: {} bytes (limit: {} bytes)",
                    text.len(),
                    MAX_TTS_INPUT_BYTES
                ),
            ));
        }

        let request = SpeechRequest {
            model: &self.config.model,
            input: text,
            voice: &profile.voice,
            speed: profile.speed,
            response_format: "mp3",
        };

        let mut builder = self.client.post(self.url()).timeout(TTS_TIMEOUT).json(&request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| VoiceError::from_request(ServiceKind::Synthesis, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::unavailable(
                ServiceKind::Synthesis,
                format!("HTTP {}: {}", status, body),
            ));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| VoiceError::invalid(ServiceKind::Synthesis, e.to_string()))?;
        Ok(audio.to_vec())
    }
}

/// Audio produced for a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOutcome {
    pub audio: Vec<u8>,
    /// Number of engine calls made.
    pub attempts: u32,
    /// True when every attempt failed and `audio` is the fallback tone.
    pub fallback: bool,
}

/// Calls the engine up to `policy.max_attempts` times, pausing between
/// attempts. An empty body counts as a failed attempt. When the budget is
/// spent the fallback tone is returned so the client still hears something.
pub async fn synthesize_with_fallback(
    engine: &dyn SpeechSynthesizer,
    text: &str,
    profile: &VoiceProfile,
    policy: RetryPolicy,
) -> SynthesisOutcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    let last_error = loop {
        attempt += 1;
        let err = match engine.synthesize(text, profile).await {
            Ok(audio) if !audio.is_empty() => {
                return SynthesisOutcome {
                    audio,
                    attempts: attempt,
                    fallback: false,
                };
            }
            Ok(_) => VoiceError::invalid(ServiceKind::Synthesis, "empty audio"),
            Err(e) => e,
        };
        warn!(attempt, max_attempts, "TTS attempt failed: {}", err);
        if attempt >= max_attempts {
            break err;
        }
        tokio::time::sleep(policy.delay).await;
    };

    error!(attempts = attempt, "all TTS attempts failed, using fallback tone: {}", last_error);
    SynthesisOutcome {
        audio: tone::fallback_beep(),
        attempts: attempt,
        fallback: true,
    }
}
