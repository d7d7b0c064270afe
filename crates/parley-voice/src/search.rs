use crate::chat::{complete, ChatRequest};
use crate::config::SearchConfig;
use crate::error::{ServiceKind, VoiceError};
use async_trait::async_trait;
use parley_types::Message;
use reqwest::Client;
use std::sync::Arc;
use tracing::{error, warn};

/// Constrains search answers to something that sounds right when spoken.
pub const SEARCH_INSTRUCTION: &str = "You are a helpful assistant. Provide concise, accurate answers based on current web information. Keep responses brief (2-3 sentences max). Do NOT include citation numbers, brackets, or reference markers in your response. Speak naturally without mentioning sources.";

pub const SEARCH_NOT_CONFIGURED: &str = "Web search is not configured.";
pub const SEARCH_FAILED: &str = "Web search failed. Using local knowledge instead.";
pub const SEARCH_UNAVAILABLE: &str = "Web search unavailable. Using local knowledge instead.";

/// Web-search answer engine.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Answers a natural-language query from current web information.
    async fn search(&self, query: &str) -> Result<String, VoiceError>;
}

/// Perplexity Sonar behind its chat-completions API.
#[derive(Debug, Clone)]
pub struct SonarSearch {
    client: Client,
    config: SearchConfig,
}

impl SonarSearch {
    pub fn new(client: Client, config: SearchConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl WebSearch for SonarSearch {
    async fn search(&self, query: &str) -> Result<String, VoiceError> {
        let messages = [Message::system(SEARCH_INSTRUCTION), Message::user(query)];
        let request = ChatRequest {
            model: &self.config.model,
            messages: &messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: None,
            stream: false,
        };
        complete(
            &self.client,
            ServiceKind::Search,
            &self.config.base_url,
            &self.config.api_key,
            self.config.timeout(),
            &request,
        )
        .await
    }
}

/// Search front end used by a turn. Never fails: every error becomes a short
/// spoken fallback so the turn can still complete.
#[derive(Clone, Default)]
pub struct SearchAssistant {
    engine: Option<Arc<dyn WebSearch>>,
}

impl SearchAssistant {
    pub fn new(engine: Arc<dyn WebSearch>) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    pub fn disabled() -> Self {
        Self { engine: None }
    }

    pub fn is_configured(&self) -> bool {
        self.engine.is_some()
    }

    pub async fn answer(&self, query: &str) -> String {
        let Some(engine) = &self.engine else {
            return SEARCH_NOT_CONFIGURED.to_string();
        };
        match engine.search(query).await {
            Ok(answer) => answer,
            Err(e @ VoiceError::InvalidResponse { .. }) => {
                warn!("web search returned an unusable answer: {}", e);
                SEARCH_FAILED.to_string()
            }
            Err(e @ VoiceError::ServiceUnavailable { .. }) => {
                error!("web search error: {}", e);
                SEARCH_UNAVAILABLE.to_string()
            }
        }
    }
}

impl std::fmt::Debug for SearchAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchAssistant")
            .field("configured", &self.is_configured())
            .finish()
    }
}
