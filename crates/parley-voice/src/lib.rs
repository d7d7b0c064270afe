//! Voice turn pipeline for the Parley relay.
//!
//! A turn takes one recorded utterance through speech-to-text, picks an
//! answer engine (web search or the conversational model), synthesizes the
//! reply and hands every step's result to an [`EventSink`]. The four remote
//! engines sit behind traits so they can be swapped or faked:
//!
//! - [`Transcriber`]: Whisper via an OpenAI-compatible API
//! - [`ChatModel`]: chat completions
//! - [`WebSearch`]: search-augmented answers, wrapped by [`SearchAssistant`]
//!   which turns every failure into spoken fallback text
//! - [`SpeechSynthesizer`]: text-to-speech, retried and backed by a tone
//!
//! Each connection owns one [`ConversationSession`] and one [`ScratchDir`];
//! the engines themselves live in a shared, immutable [`VoiceServices`].

pub mod chat;
pub mod config;
pub mod error;
pub mod history;
pub mod router;
pub mod scratch;
pub mod search;
pub mod service;
pub mod session;
pub mod stt;
pub mod tone;
pub mod tts;

pub use chat::{ChatCompletions, ChatModel};
pub use config::{
    ChatConfig, RetryPolicy, SearchConfig, SynthesisConfig, TranscriptionConfig,
    DEFAULT_SYSTEM_PROMPT,
};
pub use error::{ServiceKind, TurnError, VoiceError};
pub use history::ConversationHistory;
pub use router::{route, Route};
pub use scratch::ScratchDir;
pub use search::{SearchAssistant, SonarSearch, WebSearch};
pub use service::VoiceServices;
pub use session::{ConversationSession, EventSink, TurnReport, TurnTimings};
pub use stt::{Transcriber, WhisperTranscriber};
pub use tts::{synthesize_with_fallback, SpeechEndpoint, SpeechSynthesizer, SynthesisOutcome};
