//! Conversation Memory
//!
//! Thread-keyed checkpointing for conversation history. The agent loads
//! and saves a `Conversation` per thread identifier; callers only supply
//! the identifier and treat the stored history as opaque.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{AgentError, Result};
use crate::message::Conversation;

/// Default thread used when the caller does not scope the conversation
pub const DEFAULT_THREAD_ID: &str = "1";

/// Opaque key scoping one conversation history
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self(DEFAULT_THREAD_ID.into())
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

/// Checkpointer trait for conversation persistence
pub trait Checkpointer: Send + Sync {
    /// Load the conversation for a thread, if any
    fn load(&self, thread: &ThreadId) -> Result<Option<Conversation>>;

    /// Save the conversation for a thread
    fn save(&self, thread: &ThreadId, conversation: &Conversation) -> Result<()>;

    /// Drop a thread's history
    fn delete(&self, thread: &ThreadId) -> Result<()>;
}

/// In-memory checkpointer; history lives for the process lifetime
pub struct MemorySaver {
    threads: RwLock<HashMap<ThreadId, Conversation>>,
}

impl Default for MemorySaver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySaver {
    pub fn new() -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
        }
    }

    /// Number of threads with stored history
    pub fn thread_count(&self) -> usize {
        self.threads.read().map(|t| t.len()).unwrap_or(0)
    }
}

impl Checkpointer for MemorySaver {
    fn load(&self, thread: &ThreadId) -> Result<Option<Conversation>> {
        let threads = self
            .threads
            .read()
            .map_err(|_| AgentError::Memory("checkpointer lock poisoned".into()))?;
        Ok(threads.get(thread).cloned())
    }

    fn save(&self, thread: &ThreadId, conversation: &Conversation) -> Result<()> {
        let mut threads = self
            .threads
            .write()
            .map_err(|_| AgentError::Memory("checkpointer lock poisoned".into()))?;
        threads.insert(thread.clone(), conversation.clone());
        Ok(())
    }

    fn delete(&self, thread: &ThreadId) -> Result<()> {
        let mut threads = self
            .threads
            .write()
            .map_err(|_| AgentError::Memory("checkpointer lock poisoned".into()))?;
        threads.remove(thread);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn test_default_thread() {
        assert_eq!(ThreadId::default().as_str(), "1");
    }

    #[test]
    fn test_save_and_load() {
        let saver = MemorySaver::new();
        let thread = ThreadId::from("t1");

        assert!(saver.load(&thread).unwrap().is_none());

        let mut conv = Conversation::new();
        conv.push(Message::user("hello"));
        saver.save(&thread, &conv).unwrap();

        let loaded = saver.load(&thread).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_threads_are_isolated() {
        let saver = MemorySaver::new();
        let mut conv = Conversation::new();
        conv.push(Message::user("only in t1"));
        saver.save(&ThreadId::from("t1"), &conv).unwrap();

        assert!(saver.load(&ThreadId::from("t2")).unwrap().is_none());
        assert_eq!(saver.thread_count(), 1);
    }

    #[test]
    fn test_delete() {
        let saver = MemorySaver::new();
        let thread = ThreadId::from("gone");
        saver.save(&thread, &Conversation::new()).unwrap();
        saver.delete(&thread).unwrap();
        assert!(saver.load(&thread).unwrap().is_none());
    }
}
