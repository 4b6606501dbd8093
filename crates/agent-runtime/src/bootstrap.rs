//! Agent Bootstrap
//!
//! Single construction path shared by the CLI and the server: load
//! configuration, connect the provider, discover remote tools (with
//! graceful degradation), and assemble the agent.

use std::sync::Arc;

use agent_core::{
    error::Result,
    reasoning::{Agent, AgentBuilder},
    tool::{Tool, ToolRegistry},
    LlmProvider, MemorySaver,
};

use crate::azure::{AzureConfig, AzureOpenAiProvider};
use crate::mcp::{McpClient, McpConfig, McpRemoteTool};

/// Combined runtime configuration
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub azure: AzureConfig,
    pub mcp: McpConfig,
}

impl RuntimeConfig {
    /// Load all configuration from the environment, failing fast on
    /// any missing required variable
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            azure: AzureConfig::from_env()?,
            mcp: McpConfig::from_env()?,
        })
    }
}

/// Fetch remote tool descriptors and wrap them as local tools.
///
/// A down tool server is not fatal: the agent runs with built-ins only.
pub async fn discover_remote_tools(client: &Arc<McpClient>) -> Vec<Arc<dyn Tool>> {
    match client.list_tools().await {
        Ok(descriptors) => {
            tracing::info!(
                count = descriptors.len(),
                url = client.url(),
                "loaded remote tools"
            );
            descriptors
                .into_iter()
                .map(|d| Arc::new(McpRemoteTool::new(client.clone(), d)) as Arc<dyn Tool>)
                .collect()
        }
        Err(e) => {
            tracing::warn!("Could not connect to MCP server: {}", e);
            Vec::new()
        }
    }
}

/// Assemble an agent from a provider and discovered remote tools.
///
/// Built-in tools are always registered; remote tools add to them.
pub fn build_agent(
    provider: Arc<dyn LlmProvider>,
    remote_tools: Vec<Arc<dyn Tool>>,
    deployment: &str,
) -> Result<Agent> {
    let mut tools = ToolRegistry::with_builtins();
    for tool in remote_tools {
        tools.register_boxed(tool);
    }

    AgentBuilder::new()
        .provider(provider)
        .tools(tools)
        .memory(Arc::new(MemorySaver::new()))
        .model(deployment)
        .build()
}

/// Full startup sequence: configuration, provider, tool discovery,
/// agent assembly. Returns the agent and the MCP client handle.
pub async fn start() -> Result<(Agent, Arc<McpClient>)> {
    let config = RuntimeConfig::from_env()?;

    let deployment = config.azure.deployment.clone();
    let provider = Arc::new(AzureOpenAiProvider::from_config(config.azure)?);
    let mcp = Arc::new(McpClient::from_config(config.mcp)?);

    let remote_tools = discover_remote_tools(&mcp).await;
    let agent = build_agent(provider, remote_tools, &deployment)?;

    Ok((agent, mcp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::error::AgentError;
    use agent_core::provider::{
        Completion, CompletionStream, GenerationOptions, ModelInfo, ProviderInfo,
    };
    use agent_core::Message;
    use async_trait::async_trait;

    struct NullProvider;

    #[async_trait]
    impl LlmProvider for NullProvider {
        async fn info(&self) -> agent_core::Result<ProviderInfo> {
            Err(AgentError::ProviderUnavailable("test".into()))
        }

        async fn health_check(&self) -> agent_core::Result<bool> {
            Ok(false)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _options: &GenerationOptions,
        ) -> agent_core::Result<Completion> {
            Err(AgentError::ProviderUnavailable("test".into()))
        }

        async fn complete_stream(
            &self,
            _messages: &[Message],
            _options: &GenerationOptions,
        ) -> agent_core::Result<CompletionStream> {
            Err(AgentError::ProviderUnavailable("test".into()))
        }

        async fn list_models(&self) -> agent_core::Result<Vec<ModelInfo>> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_build_agent_registers_builtins() {
        let agent = build_agent(Arc::new(NullProvider), Vec::new(), "gpt-4.1").unwrap();
        assert!(agent.tools().get("calculate").is_some());
        assert!(agent.tools().get("get_current_time").is_some());
        assert_eq!(agent.config().generation.model, "gpt-4.1");
    }

    #[tokio::test]
    async fn test_discovery_degrades_when_server_is_down() {
        let client = Arc::new(
            McpClient::from_config(McpConfig {
                url: "http://127.0.0.1:9/mcp".into(),
                api_key: "test".into(),
                timeout_secs: 1,
            })
            .unwrap(),
        );

        let tools = discover_remote_tools(&client).await;
        assert!(tools.is_empty());
    }
}
