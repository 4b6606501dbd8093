//! # agent-core
//!
//! Core agent logic: provider-agnostic LLM abstraction, extensible tool
//! system, constrained expression evaluation, and thread-checkpointed
//! conversation memory.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Agent                                  │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐   │
//! │  │  Reasoning  │  │    Tools    │  │   LlmProvider       │   │
//! │  │    Loop     │──│   Registry  │──│   (Strategy)        │   │
//! │  └──────┬──────┘  └─────────────┘  └─────────────────────┘   │
//! │         │ per-thread load/save                                │
//! │  ┌──────┴──────┐                                              │
//! │  │ Checkpointer │                                             │
//! │  └─────────────┘                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Front-ends talk to the agent exclusively through [`invoke`]: faults
//! never cross that boundary, they come back as error-shaped outcomes.

pub mod error;
pub mod expr;
pub mod invoke;
pub mod memory;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod tool;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AgentError, Result};
pub use invoke::{agent_response, invoke_agent, render_outcome, AgentOutcome};
pub use memory::{Checkpointer, MemorySaver, ThreadId, DEFAULT_THREAD_ID};
pub use message::{Conversation, Message, Role};
pub use provider::LlmProvider;
pub use reasoning::{Agent, AgentBuilder};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
