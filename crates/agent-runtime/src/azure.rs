//! Azure OpenAI LLM Provider
//!
//! Implementation of `LlmProvider` against the Azure OpenAI chat
//! completions REST API (deployment-scoped endpoints, `api-key` header
//! auth, SSE streaming).

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Completion, CompletionStream, FinishReason, GenerationOptions, LlmProvider, ModelInfo,
        ProviderInfo, StreamChunk, TokenUsage,
    },
};
use async_trait::async_trait;
use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};

/// API version is a fixed literal, not configuration
pub const OPENAI_API_VERSION: &str = "2024-02-01";

/// Azure OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct AzureConfig {
    /// API key for the resource
    pub api_key: String,

    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,

    /// Deployment name serving the chat model
    pub deployment: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AgentError::Config(format!(
            "missing required environment variable {}",
            name
        ))),
    }
}

impl AzureConfig {
    /// Load from environment, failing fast on missing variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: require_env("AZURE_OPENAI_API_KEY")?,
            endpoint: require_env("AZURE_OPENAI_ENDPOINT")?
                .trim_end_matches('/')
                .to_string(),
            deployment: require_env("AZURE_OPENAI_DEPLOYMENT_NAME")?,
            timeout_secs: 120,
        })
    }
}

/// Azure OpenAI chat-completions provider
pub struct AzureOpenAiProvider {
    http: reqwest::Client,
    config: AzureConfig,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest {
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

impl From<&WireUsage> for TokenUsage {
    fn from(usage: &WireUsage) -> Self {
        TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

fn map_finish_reason(reason: Option<&str>) -> Option<FinishReason> {
    reason.map(|r| match r {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "tool_calls" | "function_call" => FinishReason::ToolUse,
        "content_filter" => FinishReason::ContentFilter,
        _ => FinishReason::Error,
    })
}

impl AzureOpenAiProvider {
    /// Create from configuration
    pub fn from_config(config: AzureConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("building HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(AzureConfig::from_env()?)
    }

    /// Deployment this provider is bound to
    pub fn deployment(&self) -> &str {
        &self.config.deployment
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint, self.config.deployment, OPENAI_API_VERSION
        )
    }

    fn models_url(&self) -> String {
        format!(
            "{}/openai/models?api-version={}",
            self.config.endpoint, OPENAI_API_VERSION
        )
    }

    /// Convert agent messages to the wire format
    fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    // Tool results appear as user context; native tool
                    // calling would require call IDs we don't carry
                    Role::Tool => "user",
                };
                WireMessage {
                    role,
                    content: m.content.clone(),
                }
            })
            .collect()
    }

    fn build_request(messages: &[Message], options: &GenerationOptions, stream: bool) -> ChatRequest {
        ChatRequest {
            messages: Self::convert_messages(messages),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            stop: options.stop_sequences.clone(),
            stream,
        }
    }

    async fn post_chat(&self, body: &ChatRequest) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(self.chat_url())
            .header("api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::Provider(format!("HTTP {}: {}", status, detail)));
        }

        Ok(response)
    }
}

/// Parse one SSE line from the streaming response.
///
/// Returns `None` for keep-alives and non-data lines.
fn parse_stream_line(line: &str) -> Option<Result<StreamChunk>> {
    let payload = line.trim().strip_prefix("data:")?.trim();

    if payload == "[DONE]" {
        return Some(Ok(StreamChunk {
            delta: String::new(),
            done: true,
            usage: None,
        }));
    }

    match serde_json::from_str::<StreamResponse>(payload) {
        Ok(parsed) => {
            let choice = parsed.choices.first();
            Some(Ok(StreamChunk {
                delta: choice
                    .and_then(|c| c.delta.content.clone())
                    .unwrap_or_default(),
                done: choice.is_some_and(|c| c.finish_reason.is_some()),
                usage: parsed.usage.as_ref().map(TokenUsage::from),
            }))
        }
        Err(e) => Some(Err(AgentError::Provider(format!(
            "invalid stream payload: {}",
            e
        )))),
    }
}

struct SseState {
    bytes: Pin<Box<dyn Stream<Item = reqwest::Result<bytes::Bytes>> + Send>>,
    buffer: String,
    pending: VecDeque<Result<StreamChunk>>,
    finished: bool,
}

#[async_trait]
impl LlmProvider for AzureOpenAiProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        let models = self.list_models().await.unwrap_or_default();

        Ok(ProviderInfo {
            name: "Azure OpenAI".into(),
            version: Some(OPENAI_API_VERSION.into()),
            models,
            supports_streaming: true,
            supports_tools: false, // tool use goes through the prompt format
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Azure OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let body = Self::build_request(messages, options, false);
        let response = self.post_chat(&body).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("invalid completion response: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("completion had no choices".into()))?;

        let finish_reason = map_finish_reason(choice.finish_reason.as_deref());

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            model: self.config.deployment.clone(),
            usage: parsed.usage.as_ref().map(TokenUsage::from),
            truncated: finish_reason == Some(FinishReason::Length),
            finish_reason,
        })
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let body = Self::build_request(messages, options, true);
        let response = self.post_chat(&body).await?;

        let state = SseState {
            bytes: Box::pin(response.bytes_stream()),
            buffer: String::new(),
            pending: VecDeque::new(),
            finished: false,
        };

        let mapped = stream::unfold(state, |mut state| async move {
            loop {
                if let Some(item) = state.pending.pop_front() {
                    return Some((item, state));
                }
                if state.finished {
                    return None;
                }

                match state.bytes.next().await {
                    Some(Ok(bytes)) => {
                        state.buffer.push_str(&String::from_utf8_lossy(&bytes));
                        while let Some(pos) = state.buffer.find('\n') {
                            let line: String = state.buffer.drain(..=pos).collect();
                            if let Some(parsed) = parse_stream_line(&line) {
                                if matches!(&parsed, Ok(chunk) if chunk.done) {
                                    state.finished = true;
                                }
                                state.pending.push_back(parsed);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        state.finished = true;
                        state
                            .pending
                            .push_back(Err(AgentError::Provider(e.to_string())));
                    }
                    None => {
                        state.finished = true;
                    }
                }
            }
        });

        Ok(Box::pin(mapped))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .http
            .get(self.models_url())
            .header("api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::ProviderUnavailable(format!("HTTP {}", status)));
        }

        let parsed: ModelList = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("invalid model list: {}", e)))?;

        Ok(parsed
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id.clone(),
                name: m.id,
                context_length: None,
                supports_vision: false,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AzureConfig {
        AzureConfig {
            api_key: "key".into(),
            endpoint: "https://example.openai.azure.com".into(),
            deployment: "gpt-4.1".into(),
            timeout_secs: 120,
        }
    }

    #[test]
    fn test_chat_url_pins_api_version() {
        let provider = AzureOpenAiProvider::from_config(config()).unwrap();
        assert_eq!(
            provider.chat_url(),
            "https://example.openai.azure.com/openai/deployments/gpt-4.1/chat/completions?api-version=2024-02-01"
        );
    }

    #[test]
    fn test_message_conversion() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("Hello"),
            Message::tool("[Tool 'calculate' returned]\n2 + 2 = 4", None),
        ];

        let converted = AzureOpenAiProvider::convert_messages(&messages);
        assert_eq!(converted.len(), 3);
        assert_eq!(converted[0].role, "system");
        assert_eq!(converted[2].role, "user");
    }

    #[test]
    fn test_completion_response_parses() {
        let payload = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Hi!"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Hi!"));
        assert_eq!(parsed.usage.unwrap().total_tokens, 12);
    }

    #[test]
    fn test_parse_stream_line() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#;
        let chunk = parse_stream_line(line).unwrap().unwrap();
        assert_eq!(chunk.delta, "Hel");
        assert!(!chunk.done);

        let done = parse_stream_line("data: [DONE]").unwrap().unwrap();
        assert!(done.done);

        assert!(parse_stream_line("").is_none());
        assert!(parse_stream_line(": keep-alive").is_none());
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason(Some("stop")), Some(FinishReason::Stop));
        assert_eq!(map_finish_reason(Some("length")), Some(FinishReason::Length));
        assert_eq!(
            map_finish_reason(Some("content_filter")),
            Some(FinishReason::ContentFilter)
        );
        assert_eq!(map_finish_reason(None), None);
    }
}
