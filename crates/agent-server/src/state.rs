//! Application State

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use agent_core::{Agent, ThreadId};
use agent_runtime::McpClient;

/// One chat session: a memory thread plus optional site context that
/// is prepended to every question submitted on it.
pub struct ChatSession {
    /// Memory thread backing this session
    pub thread: ThreadId,

    /// Site context, set by the embedding page after the session opens
    pub site: RwLock<Option<String>>,
}

impl ChatSession {
    pub fn new(thread: ThreadId) -> Self {
        Self {
            thread,
            site: RwLock::new(None),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The agent, shared across sessions; history is isolated per
    /// thread through the checkpointer
    pub agent: Arc<Agent>,

    /// MCP tool server client handle
    pub mcp: Arc<McpClient>,

    /// Open sessions by id
    pub sessions: Arc<RwLock<HashMap<String, Arc<ChatSession>>>>,
}

impl AppState {
    pub fn new(agent: Agent, mcp: Arc<McpClient>) -> Self {
        Self {
            agent: Arc::new(agent),
            mcp,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Open a new session with a fresh thread, returning its id
    pub async fn open_session(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(ChatSession::new(ThreadId::from(id.as_str())));
        self.sessions.write().await.insert(id.clone(), session);
        id
    }

    /// Look up an open session
    pub async fn session(&self, id: &str) -> Option<Arc<ChatSession>> {
        self.sessions.read().await.get(id).cloned()
    }
}
