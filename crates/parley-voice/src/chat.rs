use crate::config::ChatConfig;
use crate::error::{ServiceKind, VoiceError};
use async_trait::async_trait;
use parley_types::Message;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout for a chat completion request.
const CHAT_TIMEOUT: Duration = Duration::from_secs(30);

/// Conversational language model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produces the assistant's next reply for the given history.
    async fn reply(&self, history: &[Message]) -> Result<String, VoiceError>;
}

/// OpenAI-compatible `/chat/completions` client.
#[derive(Debug, Clone)]
pub struct ChatCompletions {
    client: Client,
    config: ChatConfig,
}

impl ChatCompletions {
    pub fn new(client: Client, config: ChatConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ChatModel for ChatCompletions {
    async fn reply(&self, history: &[Message]) -> Result<String, VoiceError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: history,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: Some(self.config.top_p),
            stream: false,
        };
        complete(
            &self.client,
            ServiceKind::Chat,
            &self.config.base_url,
            &self.config.api_key,
            CHAT_TIMEOUT,
            &request,
        )
        .await
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Sends one non-streaming completion and returns the first choice's text.
pub(crate) async fn complete(
    client: &Client,
    service: ServiceKind,
    base_url: &str,
    api_key: &str,
    timeout: Duration,
    request: &ChatRequest<'_>,
) -> Result<String, VoiceError> {
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .timeout(timeout)
        .json(request)
        .send()
        .await
        .map_err(|e| VoiceError::from_request(service, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(VoiceError::unavailable(
            service,
            format!("HTTP {}: {}", status, body),
        ));
    }

    let body: ChatResponse = response
        .json()
        .await
        .map_err(|e| VoiceError::invalid(service, e.to_string()))?;
    extract_reply(service, body)
}

fn extract_reply(service: ServiceKind, body: ChatResponse) -> Result<String, VoiceError> {
    let content = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| VoiceError::invalid(service, "no choices in response"))?
        .message
        .content
        .unwrap_or_default();
    let content = content.trim();
    if content.is_empty() {
        return Err(VoiceError::invalid(service, "empty reply"));
    }
    Ok(content.to_string())
}
