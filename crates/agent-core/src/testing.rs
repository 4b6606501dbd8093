//! Test support: scripted provider for exercising the loop offline.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{
    Completion, CompletionStream, FinishReason, GenerationOptions, LlmProvider, ModelInfo,
    ProviderInfo,
};

/// Provider that replays scripted responses in order
pub(crate) struct ScriptedProvider {
    responses: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub(crate) fn new(responses: &[&str]) -> Self {
        let mut scripted: Vec<String> = responses.iter().map(|s| (*s).to_string()).collect();
        scripted.reverse();
        Self {
            responses: Mutex::new(scripted),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        Ok(ProviderInfo {
            name: "Scripted".into(),
            version: None,
            models: vec![],
            supports_streaming: false,
            supports_tools: false,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        _messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let content = self
            .responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| AgentError::Provider("script exhausted".into()))?;
        Ok(Completion {
            content,
            model: options.model.clone(),
            usage: None,
            truncated: false,
            finish_reason: Some(FinishReason::Stop),
        })
    }

    async fn complete_stream(
        &self,
        _messages: &[Message],
        _options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        Err(AgentError::Provider("streaming not scripted".into()))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![])
    }
}
