use crate::chat::{ChatCompletions, ChatModel};
use crate::config::{
    ChatConfig, RetryPolicy, SearchConfig, SynthesisConfig, TranscriptionConfig,
    DEFAULT_SYSTEM_PROMPT,
};
use crate::search::{SearchAssistant, SonarSearch, WebSearch};
use crate::stt::{Transcriber, WhisperTranscriber};
use crate::tts::{SpeechEndpoint, SpeechSynthesizer};
use parley_types::VoiceProfile;
use reqwest::Client;
use std::fmt;
use std::sync::Arc;

/// Process-wide handles to the remote engines plus the fixed turn settings.
///
/// Built once at startup and shared by every connection through an `Arc`;
/// nothing in here is mutated afterwards.
#[derive(Clone)]
pub struct VoiceServices {
    transcriber: Arc<dyn Transcriber>,
    chat: Arc<dyn ChatModel>,
    search: SearchAssistant,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    profile: VoiceProfile,
    retry: RetryPolicy,
    system_prompt: String,
}

impl VoiceServices {
    /// Creates a bundle with search disabled and default voice settings.
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        chat: Arc<dyn ChatModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            transcriber,
            chat,
            search: SearchAssistant::disabled(),
            synthesizer,
            profile: VoiceProfile::default(),
            retry: RetryPolicy::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Wires the HTTP engines described by the configuration. Search stays
    /// disabled when it has no API key.
    pub fn from_config(
        client: Client,
        transcription: TranscriptionConfig,
        chat: ChatConfig,
        search: SearchConfig,
        synthesis: SynthesisConfig,
    ) -> Self {
        let system_prompt = chat.system_prompt.clone();
        let profile = synthesis.profile();
        let retry = synthesis.retry_policy();
        let search_enabled = search.is_enabled();

        let services = Self::new(
            Arc::new(WhisperTranscriber::new(client.clone(), transcription)),
            Arc::new(ChatCompletions::new(client.clone(), chat)),
            Arc::new(SpeechEndpoint::new(client.clone(), synthesis)),
        )
        .with_profile(profile)
        .with_retry_policy(retry)
        .with_system_prompt(system_prompt);

        if search_enabled {
            services.with_search(Arc::new(SonarSearch::new(client, search)))
        } else {
            services
        }
    }

    pub fn with_search(mut self, engine: Arc<dyn WebSearch>) -> Self {
        self.search = SearchAssistant::new(engine);
        self
    }

    pub fn with_profile(mut self, profile: VoiceProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn transcriber(&self) -> &dyn Transcriber {
        self.transcriber.as_ref()
    }

    pub fn chat(&self) -> &dyn ChatModel {
        self.chat.as_ref()
    }

    pub fn search(&self) -> &SearchAssistant {
        &self.search
    }

    pub fn synthesizer(&self) -> &dyn SpeechSynthesizer {
        self.synthesizer.as_ref()
    }

    pub fn profile(&self) -> &VoiceProfile {
        &self.profile
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

impl fmt::Debug for VoiceServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceServices")
            .field("search", &self.search)
            .field("profile", &self.profile)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
