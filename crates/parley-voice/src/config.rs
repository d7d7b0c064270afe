use parley_types::voice::{DEFAULT_SPEED, DEFAULT_VOICE};
use parley_types::VoiceProfile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Groq's OpenAI-compatible API, used for transcription and chat.
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Perplexity's API, used for search-augmented answers.
pub const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";

/// Local OpenAI-compatible speech bridge (e.g. openai-edge-tts).
pub const SPEECH_BASE_URL: &str = "http://127.0.0.1:5050/v1";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Keep responses very brief (1-2 sentences max). Be concise and direct.";

fn default_groq_url() -> String {
    GROQ_BASE_URL.to_string()
}

fn default_transcription_model() -> String {
    "whisper-large-v3-turbo".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_chat_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_chat_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    150
}

fn default_top_p() -> f32 {
    0.95
}

fn default_search_url() -> String {
    PERPLEXITY_BASE_URL.to_string()
}

fn default_search_model() -> String {
    "sonar".to_string()
}

fn default_search_temperature() -> f32 {
    0.2
}

fn default_search_timeout_secs() -> u64 {
    10
}

fn default_speech_url() -> String {
    SPEECH_BASE_URL.to_string()
}

fn default_speech_model() -> String {
    "tts-1".to_string()
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_speed() -> f32 {
    DEFAULT_SPEED
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

/// Speech-to-text endpoint settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default = "default_groq_url")]
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_transcription_model")]
    pub model: String,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: default_groq_url(),
            api_key: String::new(),
            model: default_transcription_model(),
            language: default_language(),
        }
    }
}

impl fmt::Debug for TranscriptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("language", &self.language)
            .finish()
    }
}

/// Conversational language-model settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_groq_url")]
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    /// First message of every conversation history.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_chat_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_groq_url(),
            api_key: String::new(),
            model: default_chat_model(),
            system_prompt: default_system_prompt(),
            temperature: default_chat_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
        }
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("top_p", &self.top_p)
            .finish_non_exhaustive()
    }
}

/// Search-augmented answer engine settings. Search is disabled when
/// `api_key` is empty.
#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_url")]
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_search_model")]
    pub model: String,
    #[serde(default = "default_search_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout in seconds. Default: 10.
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

impl SearchConfig {
    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_url(),
            api_key: String::new(),
            model: default_search_model(),
            temperature: default_search_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

/// Text-to-speech settings, including the retry budget before the fallback
/// tone is used.
#[derive(Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_speech_url")]
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_speech_model")]
    pub model: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl SynthesisConfig {
    pub fn profile(&self) -> VoiceProfile {
        VoiceProfile::new(self.voice.clone(), self.speed)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            base_url: default_speech_url(),
            api_key: String::new(),
            model: default_speech_model(),
            voice: default_voice(),
            speed: default_speed(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl fmt::Debug for SynthesisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("speed", &self.speed)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .finish()
    }
}

/// Bounded retry budget for speech synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: Duration::from_millis(default_retry_delay_ms()),
        }
    }
}
