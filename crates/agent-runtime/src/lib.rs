//! # agent-runtime
//!
//! Runtime integrations for the agent system.
//!
//! ## Modules
//!
//! - **azure**: Azure OpenAI chat-completions provider
//! - **mcp**: JSON-RPC client for a remote MCP tool server
//! - **bootstrap**: shared startup path for the CLI and the server
//!
//! ## Usage
//!
//! ```rust,ignore
//! let (agent, _mcp) = agent_runtime::bootstrap::start().await?;
//! let answer = agent.ask("What is 2 + 2?").await?;
//! ```

pub mod azure;
pub mod bootstrap;
pub mod mcp;

pub use azure::{AzureConfig, AzureOpenAiProvider, OPENAI_API_VERSION};
pub use bootstrap::{build_agent, discover_remote_tools, start, RuntimeConfig};
pub use mcp::{McpClient, McpConfig, McpRemoteTool, RemoteToolDescriptor};

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentError, LlmProvider, Message, Result, Role, ThreadId, Tool, ToolRegistry,
};
