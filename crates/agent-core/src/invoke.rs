//! Invocation Adapter
//!
//! The boundary between front-ends and the reasoning loop. Faults from
//! the loop never propagate past this module; they come back as an
//! error-shaped outcome that the formatter renders as text.

use serde::{Deserialize, Serialize};

use crate::memory::ThreadId;
use crate::message::Message;
use crate::reasoning::Agent;

/// Structured result of one agent invocation: either the full message
/// history after the turn, or an error description. Never both.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentOutcome {
    /// Conversation messages after the turn (empty on error)
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Error description when the invocation failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentOutcome {
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            error: None,
        }
    }

    pub fn from_error(error: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Prefix user input with site context.
///
/// The template is fixed; downstream consumers parse this exact shape,
/// including the indentation before "User Question".
pub fn with_site_context(site: &str, user_input: &str) -> String {
    format!("Site: {}\n\n        User Question: {}", site, user_input)
}

/// Invoke the agent with user input on a thread.
///
/// Catch-all boundary: every fault becomes an error outcome.
pub async fn invoke_agent(agent: &Agent, user_input: &str, thread: &ThreadId) -> AgentOutcome {
    match agent.run_thread(thread, user_input).await {
        Ok(conversation) => AgentOutcome::from_messages(conversation.messages().to_vec()),
        Err(e) => {
            tracing::warn!(thread = %thread, error = %e, "agent invocation failed");
            AgentOutcome::from_error(e.to_string())
        }
    }
}

/// Extract the display text from an invocation outcome.
pub fn render_outcome(outcome: &AgentOutcome) -> String {
    if let Some(error) = &outcome.error {
        return format!("Error: {}", error);
    }

    let Some(last) = outcome.messages.last() else {
        return "No response generated.".into();
    };

    if last.content.is_empty() {
        // No text content: fall back to the message's representation
        serde_json::to_string(last).unwrap_or_else(|_| format!("{:?}", last))
    } else {
        last.content.clone()
    }
}

/// Get a formatted text response from the agent, with optional site
/// context prepended to the user input.
pub async fn agent_response(
    agent: &Agent,
    user_input: &str,
    thread: &ThreadId,
    site: Option<&str>,
) -> String {
    let submitted = match site {
        Some(site) => with_site_context(site, user_input),
        None => user_input.to_string(),
    };

    let outcome = invoke_agent(agent, &submitted, thread).await;
    render_outcome(&outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Checkpointer, MemorySaver};
    use crate::message::Role;
    use crate::reasoning::AgentBuilder;
    use crate::testing::ScriptedProvider;
    use crate::tool::ToolRegistry;
    use std::sync::Arc;

    fn scripted_agent(responses: &[&str]) -> Agent {
        AgentBuilder::new()
            .provider(Arc::new(ScriptedProvider::new(responses)))
            .tools(ToolRegistry::with_builtins())
            .build()
            .unwrap()
    }

    #[test]
    fn test_site_template_is_verbatim() {
        assert_eq!(
            with_site_context("example.com", "hello"),
            "Site: example.com\n\n        User Question: hello"
        );
    }

    #[test]
    fn test_render_error() {
        let outcome = AgentOutcome::from_error("boom");
        assert_eq!(render_outcome(&outcome), "Error: boom");
    }

    #[test]
    fn test_render_empty_messages() {
        let outcome = AgentOutcome::from_messages(vec![]);
        assert_eq!(render_outcome(&outcome), "No response generated.");
    }

    #[test]
    fn test_render_last_message_text() {
        let outcome = AgentOutcome::from_messages(vec![
            Message::user("q"),
            Message::assistant("final answer"),
        ]);
        assert_eq!(render_outcome(&outcome), "final answer");
    }

    #[test]
    fn test_render_falls_back_to_representation() {
        let outcome = AgentOutcome::from_messages(vec![Message::assistant("")]);
        let rendered = render_outcome(&outcome);
        assert!(rendered.contains("\"role\":\"assistant\""));
    }

    #[tokio::test]
    async fn test_invoke_returns_messages() {
        let agent = scripted_agent(&["hi there"]);
        let outcome = invoke_agent(&agent, "hello", &ThreadId::default()).await;

        assert!(!outcome.is_error());
        assert_eq!(outcome.messages.last().unwrap().content, "hi there");
    }

    #[tokio::test]
    async fn test_invoke_never_raises() {
        // Empty script: the provider errors on the first completion
        let agent = scripted_agent(&[]);
        let outcome = invoke_agent(&agent, "hello", &ThreadId::default()).await;

        assert!(outcome.is_error());
        assert!(outcome.messages.is_empty());
        assert!(render_outcome(&outcome).starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_agent_response_submits_site_context() {
        let memory: Arc<dyn Checkpointer> = Arc::new(MemorySaver::new());
        let agent = AgentBuilder::new()
            .provider(Arc::new(ScriptedProvider::new(&["ok"])))
            .tools(ToolRegistry::with_builtins())
            .memory(memory.clone())
            .build()
            .unwrap();

        let thread = ThreadId::default();
        let response = agent_response(&agent, "hello", &thread, Some("example.com")).await;
        assert_eq!(response, "ok");

        let stored = memory.load(&thread).unwrap().unwrap();
        let submitted = stored
            .messages()
            .iter()
            .find(|m| m.role == Role::User)
            .unwrap();
        assert_eq!(
            submitted.content,
            "Site: example.com\n\n        User Question: hello"
        );
    }
}
