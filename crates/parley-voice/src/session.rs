//! One conversation: history plus the turn pipeline
//! (transcribe → route → answer → synthesize → return).

use crate::error::TurnError;
use crate::history::ConversationHistory;
use crate::router::{route, Route};
use crate::scratch::ScratchDir;
use crate::service::VoiceServices;
use crate::tts::synthesize_with_fallback;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use parley_types::OutgoingEvent;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Anything shorter is treated as an empty recording.
pub const MIN_AUDIO_BYTES: usize = 100;

/// Anything shorter is rejected before transcription.
pub const MIN_TRANSCRIBABLE_BYTES: usize = 1000;

/// Destination for the events a turn emits, in order.
#[async_trait]
pub trait EventSink: Send {
    /// Delivers one event. Failures must be reported as
    /// [`TurnError::Transport`].
    async fn send_event(&mut self, event: OutgoingEvent) -> Result<(), TurnError>;
}

#[async_trait]
impl EventSink for Vec<OutgoingEvent> {
    async fn send_event(&mut self, event: OutgoingEvent) -> Result<(), TurnError> {
        self.push(event);
        Ok(())
    }
}

/// Wall-clock duration of each stage of a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnTimings {
    pub transcription: Duration,
    pub answer: Duration,
    pub synthesis: Duration,
    pub total: Duration,
}

/// Summary of a completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub transcript: String,
    pub answer: String,
    pub route: Route,
    /// True when the reply audio is the fallback tone.
    pub fallback_audio: bool,
    pub timings: TurnTimings,
}

/// Maps a declared MIME type to the container extension the transcriber
/// expects. Chromium and Firefox record WebM/Opus, Safari MP4/AAC.
pub fn extension_for_mime(mime: Option<&str>) -> &'static str {
    let mime = mime.unwrap_or("audio/webm");
    if mime.contains("mp4") {
        "mp4"
    } else if mime.contains("wav") {
        "wav"
    } else {
        "webm"
    }
}

fn decode_audio(audio: Option<&str>) -> Result<Vec<u8>, TurnError> {
    let audio = audio.ok_or_else(|| TurnError::Validation("Audio payload is missing".to_string()))?;
    BASE64
        .decode(audio.trim())
        .map_err(|e| TurnError::Validation(format!("Audio payload is not valid base64: {}", e)))
}

fn resource(context: &str, err: std::io::Error) -> TurnError {
    TurnError::Resource(format!("{}: {}", context, err))
}

/// Per-connection conversation state. Takes `&mut self` per turn, so a
/// session can never run two turns at once.
#[derive(Debug)]
pub struct ConversationSession {
    connection_id: Uuid,
    services: Arc<VoiceServices>,
    history: ConversationHistory,
}

impl ConversationSession {
    pub fn new(connection_id: Uuid, services: Arc<VoiceServices>) -> Self {
        let history = ConversationHistory::new(services.system_prompt());
        Self {
            connection_id,
            services,
            history,
        }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Drops the user message of a turn that never produced a reply, so the
    /// next turn starts from the last completed exchange.
    pub fn abandon_turn(&mut self) {
        if let Some(dropped) = self.history.pop_user() {
            debug!(
                connection_id = %self.connection_id,
                chars = dropped.content.len(),
                "discarded unanswered user message"
            );
        }
    }

    /// Runs one full turn for a base64 audio payload, emitting
    /// `transcription`, optionally `search_started`, `response` and `audio`.
    ///
    /// On error nothing further is emitted; the caller reports the error.
    /// History is left unchanged by a failed turn.
    pub async fn process_turn(
        &mut self,
        scratch: &ScratchDir,
        mime: Option<&str>,
        audio: Option<&str>,
        sink: &mut dyn EventSink,
    ) -> Result<TurnReport, TurnError> {
        let started = Instant::now();
        let mut timings = TurnTimings::default();

        let extension = extension_for_mime(mime);
        let audio = decode_audio(audio)?;
        if audio.len() < MIN_AUDIO_BYTES {
            return Err(TurnError::Validation(
                "Audio data too short or empty".to_string(),
            ));
        }

        let input_path = scratch
            .write("input", extension, &audio)
            .await
            .map_err(|e| resource("failed to store inbound audio", e))?;
        drop(audio);

        let stt_started = Instant::now();
        let audio = tokio::fs::read(&input_path)
            .await
            .map_err(|e| resource("failed to read inbound audio", e))?;
        info!(
            connection_id = %self.connection_id,
            bytes = audio.len(),
            path = %input_path.display(),
            "audio received"
        );
        if audio.len() < MIN_TRANSCRIBABLE_BYTES {
            return Err(TurnError::Validation(format!(
                "Audio file too small: {} bytes",
                audio.len()
            )));
        }

        let transcript = self
            .services
            .transcriber()
            .transcribe(&audio, extension)
            .await?;
        timings.transcription = stt_started.elapsed();
        info!(
            connection_id = %self.connection_id,
            stt_ms = timings.transcription.as_millis() as u64,
            "transcribed: {}",
            transcript
        );

        self.history.push_user(transcript.clone());
        let answer_started = Instant::now();
        let (route, answer) = match self.answer(&transcript, sink).await {
            Ok(answered) => answered,
            Err(e) => {
                self.history.pop_user();
                return Err(e);
            }
        };
        timings.answer = answer_started.elapsed();

        self.history.push_assistant(answer.clone());
        info!(
            connection_id = %self.connection_id,
            route = route.as_str(),
            answer_ms = timings.answer.as_millis() as u64,
            history_len = self.history.len(),
            "AI: {}",
            answer
        );
        sink.send_event(OutgoingEvent::Response {
            text: answer.clone(),
        })
        .await?;

        let tts_started = Instant::now();
        let outcome = synthesize_with_fallback(
            self.services.synthesizer(),
            &answer,
            self.services.profile(),
            self.services.retry_policy(),
        )
        .await;
        // The fallback tone is WAV; name the file after what it holds.
        let output_extension = if outcome.fallback { "wav" } else { "mp3" };
        let output_path = scratch
            .write("output", output_extension, &outcome.audio)
            .await
            .map_err(|e| resource("failed to store synthesized audio", e))?;
        let written = tokio::fs::metadata(&output_path)
            .await
            .map(|meta| meta.len())
            .unwrap_or(0);
        if written == 0 {
            return Err(TurnError::Resource(
                "TTS audio file was not created".to_string(),
            ));
        }
        let speech = tokio::fs::read(&output_path)
            .await
            .map_err(|e| resource("failed to read synthesized audio", e))?;
        timings.synthesis = tts_started.elapsed();
        if outcome.fallback {
            warn!(connection_id = %self.connection_id, "sending fallback tone instead of speech");
        }

        let encoded = BASE64.encode(&speech);
        debug!(
            connection_id = %self.connection_id,
            chars = encoded.len(),
            "sending audio to client"
        );
        sink.send_event(OutgoingEvent::Audio { audio: encoded }).await?;

        timings.total = started.elapsed();
        info!(
            connection_id = %self.connection_id,
            total_ms = timings.total.as_millis() as u64,
            stt_ms = timings.transcription.as_millis() as u64,
            answer_ms = timings.answer.as_millis() as u64,
            tts_ms = timings.synthesis.as_millis() as u64,
            tts_attempts = outcome.attempts,
            voice = %self.services.profile().voice,
            rate = %self.services.profile().rate_label(),
            "turn complete"
        );

        Ok(TurnReport {
            transcript,
            answer,
            route,
            fallback_audio: outcome.fallback,
            timings,
        })
    }

    /// Emits the transcript, then asks the routed engine for a reply.
    async fn answer(
        &self,
        transcript: &str,
        sink: &mut dyn EventSink,
    ) -> Result<(Route, String), TurnError> {
        sink.send_event(OutgoingEvent::Transcription {
            text: transcript.to_string(),
        })
        .await?;

        let route = route(transcript, self.services.search().is_configured());
        let answer = match route {
            Route::Search => {
                info!(connection_id = %self.connection_id, "web search detected");
                sink.send_event(OutgoingEvent::search_started()).await?;
                // Search sees only the utterance, never the history.
                self.services.search().answer(transcript).await
            }
            Route::Chat => self.services.chat().reply(self.history.messages()).await?,
        };
        Ok((route, answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_follows_mime() {
        assert_eq!(extension_for_mime(Some("audio/mp4")), "mp4");
        assert_eq!(extension_for_mime(Some("audio/mp4;codecs=mp4a.40.2")), "mp4");
        assert_eq!(extension_for_mime(Some("audio/wav")), "wav");
        assert_eq!(extension_for_mime(Some("audio/x-wav")), "wav");
        assert_eq!(extension_for_mime(Some("audio/webm;codecs=opus")), "webm");
        assert_eq!(extension_for_mime(Some("audio/ogg")), "webm");
        assert_eq!(extension_for_mime(None), "webm");
    }

    #[test]
    fn audio_payload_must_be_base64() {
        assert!(matches!(decode_audio(None), Err(TurnError::Validation(_))));
        assert!(matches!(
            decode_audio(Some("***")),
            Err(TurnError::Validation(_))
        ));
        assert_eq!(decode_audio(Some("aGVsbG8=")).unwrap(), b"hello");
    }
}
