//! Voice profile definitions.
//!
//! A `VoiceProfile` names the synthesis voice and speaking rate used for
//! every spoken reply.

use serde::{Deserialize, Serialize};

/// Voice used when no profile is configured.
pub const DEFAULT_VOICE: &str = "en-US-JennyNeural";

/// Default speaking rate: 25% faster than the engine's normal speed, which
/// shortens playback and perceived latency.
pub const DEFAULT_SPEED: f32 = 1.25;

/// A voice profile configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Engine voice identifier.
    pub voice: String,
    /// Speech speed multiplier (1.0 is normal).
    pub speed: f32,
}

impl VoiceProfile {
    pub fn new(voice: impl Into<String>, speed: f32) -> Self {
        Self {
            voice: voice.into(),
            speed,
        }
    }

    /// Renders the speed as a signed percentage offset, e.g. `+25%`.
    pub fn rate_label(&self) -> String {
        let percent = ((self.speed - 1.0) * 100.0).round() as i32;
        format!("{:+}%", percent)
    }
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self::new(DEFAULT_VOICE, DEFAULT_SPEED)
    }
}
