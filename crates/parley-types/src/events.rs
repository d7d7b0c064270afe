//! WebSocket wire events.
//!
//! Every frame is a JSON object tagged with a `type` field. Inbound frames
//! whose type is missing or unrecognised decode to [`IncomingEvent::Unknown`]
//! so newer clients can talk to older servers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text carried by the `search_started` notification.
pub const SEARCH_STARTED_MESSAGE: &str = "Searching the web...";

/// Incoming WebSocket event types.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingEvent {
    /// A recorded utterance, base64 encoded.
    Audio {
        /// Declared container MIME type, e.g. `audio/webm;codecs=opus`.
        #[serde(default)]
        mime: Option<String>,
        #[serde(default)]
        audio: Option<String>,
    },
    /// An `audio` event whose fields have the wrong JSON types. Carries the
    /// decoder's complaint so it can be reported for that turn.
    #[serde(skip_deserializing)]
    InvalidAudio(String),
    #[serde(other)]
    Unknown,
}

impl IncomingEvent {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// Returns an error only if the frame is not JSON or is not a JSON
    /// object. A well-tagged `audio` event with bad fields decodes to
    /// [`IncomingEvent::InvalidAudio`].
    pub fn from_frame(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(fields) = &value else {
            return Err(serde::de::Error::custom("event frame must be a JSON object"));
        };
        let is_audio = match fields.get("type") {
            Some(Value::String(kind)) => kind == "audio",
            _ => return Ok(Self::Unknown),
        };
        match serde_json::from_value(value) {
            Ok(event) => Ok(event),
            Err(e) if is_audio => Ok(Self::InvalidAudio(format!("Invalid audio event: {}", e))),
            Err(e) => Err(e),
        }
    }
}

/// Outgoing WebSocket event types, in the order a turn emits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingEvent {
    Transcription { text: String },
    SearchStarted { message: String },
    Response { text: String },
    /// Synthesized reply audio, base64 encoded.
    Audio { audio: String },
    Error { message: String },
}

impl OutgoingEvent {
    pub fn search_started() -> Self {
        Self::SearchStarted {
            message: SEARCH_STARTED_MESSAGE.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Returns the wire `type` tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transcription { .. } => "transcription",
            Self::SearchStarted { .. } => "search_started",
            Self::Response { .. } => "response",
            Self::Audio { .. } => "audio",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn audio_frame_decodes() {
        let event =
            IncomingEvent::from_frame(r#"{"type":"audio","mime":"audio/mp4","audio":"AAAA"}"#)
                .unwrap();
        assert_eq!(
            event,
            IncomingEvent::Audio {
                mime: Some("audio/mp4".to_string()),
                audio: Some("AAAA".to_string()),
            }
        );
    }

    #[test]
    fn audio_frame_without_mime_decodes() {
        let event = IncomingEvent::from_frame(r#"{"type":"audio","audio":"AAAA"}"#).unwrap();
        assert!(matches!(event, IncomingEvent::Audio { mime: None, .. }));
    }

    #[test]
    fn unrecognised_and_untyped_frames_are_unknown() {
        assert_eq!(
            IncomingEvent::from_frame(r#"{"type":"ping"}"#).unwrap(),
            IncomingEvent::Unknown
        );
        assert_eq!(
            IncomingEvent::from_frame(r#"{"hello":"world"}"#).unwrap(),
            IncomingEvent::Unknown
        );
    }

    #[test]
    fn malformed_frames_are_rejected() {
        assert!(IncomingEvent::from_frame("not json").is_err());
        assert!(IncomingEvent::from_frame("[1,2,3]").is_err());
        assert!(IncomingEvent::from_frame(r#""audio""#).is_err());
    }

    #[test]
    fn audio_frame_with_wrong_field_types_is_invalid_audio() {
        let event = IncomingEvent::from_frame(r#"{"type":"audio","audio":42}"#).unwrap();
        let IncomingEvent::InvalidAudio(message) = &event else {
            panic!("expected InvalidAudio, got {:?}", event);
        };
        assert!(message.starts_with("Invalid audio event:"));

        assert!(matches!(
            IncomingEvent::from_frame(r#"{"type":"audio","mime":123,"audio":"AAAA"}"#).unwrap(),
            IncomingEvent::InvalidAudio(_)
        ));
    }

    #[test]
    fn invalid_audio_cannot_be_sent_by_name() {
        assert_eq!(
            IncomingEvent::from_frame(r#"{"type":"invalid_audio"}"#).unwrap(),
            IncomingEvent::Unknown
        );
    }

    #[test]
    fn outgoing_events_match_wire_format() {
        let cases = [
            (
                OutgoingEvent::Transcription { text: "hi".into() },
                json!({"type": "transcription", "text": "hi"}),
            ),
            (
                OutgoingEvent::search_started(),
                json!({"type": "search_started", "message": "Searching the web..."}),
            ),
            (
                OutgoingEvent::Response { text: "yo".into() },
                json!({"type": "response", "text": "yo"}),
            ),
            (
                OutgoingEvent::Audio { audio: "QQ==".into() },
                json!({"type": "audio", "audio": "QQ=="}),
            ),
            (
                OutgoingEvent::error("boom"),
                json!({"type": "error", "message": "boom"}),
            ),
        ];
        for (event, expected) in cases {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.kind());
            assert_eq!(value, expected);
        }
    }
}
