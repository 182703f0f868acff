//! Conversation history and the per-session registry.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Session key used when the caller does not supply one.
///
/// A single kiosk with no session header keeps the behavior of one shared
/// conversation.
pub const DEFAULT_SESSION: &str = "kiosk";

/// Framing instruction seeding every conversation.
const SEED_USER_TEXT: &str = "You are a hospital desk assistant";
/// Model acknowledgment paired with the framing instruction.
const SEED_MODEL_TEXT: &str =
    "Sure I will act like a hospital desk assistant with the given instructions.";

/// Speaker of a history entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// Kiosk user.
    User,
    /// Reasoning-service reply.
    Model,
}

impl ChatRole {
    /// Wire name expected by the reasoning service.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// One entry of a conversation history.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who spoke.
    pub role: ChatRole,
    /// What was said.
    pub text: String,
}

impl ChatTurn {
    /// Build a user entry.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    /// Build a model entry.
    #[must_use]
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Fresh copy of the seed template every conversation starts from.
///
/// End-of-conversation resets reassign the history from this template rather
/// than clearing it in place, so the template itself is never aliased.
#[must_use]
pub fn seed_history() -> Vec<ChatTurn> {
    vec![
        ChatTurn::user(SEED_USER_TEXT),
        ChatTurn::model(SEED_MODEL_TEXT),
    ]
}

/// Shared handle to one session's history.
///
/// The mutex is held for the whole turn, so turns within one session are
/// serialized while distinct sessions proceed concurrently.
pub type SessionHistory = Arc<Mutex<Vec<ChatTurn>>>;

/// Registry of conversation sessions keyed by caller-supplied id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionHistory>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Fetch a session's history, seeding it on first use.
    #[must_use]
    pub fn session(&self, id: &str) -> SessionHistory {
        self.sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(seed_history())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_history_shape() {
        let seed = seed_history();
        assert_eq!(seed.len(), 2);
        assert_eq!(seed[0].role, ChatRole::User);
        assert_eq!(seed[1].role, ChatRole::Model);
        assert!(seed[1].text.contains("hospital desk assistant"));
    }

    #[test]
    fn test_seed_history_returns_fresh_copies() {
        let mut a = seed_history();
        a.push(ChatTurn::user("extra"));
        assert_eq!(seed_history().len(), 2);
    }

    #[tokio::test]
    async fn test_registry_keys_sessions_separately() {
        let registry = SessionRegistry::new();
        let a = registry.session("booth-a");
        let b = registry.session("booth-b");

        a.lock().await.push(ChatTurn::user("hello"));
        assert_eq!(a.lock().await.len(), 3);
        assert_eq!(b.lock().await.len(), 2);

        // Same key resolves to the same history.
        let a_again = registry.session("booth-a");
        assert_eq!(a_again.lock().await.len(), 3);
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(ChatRole::User.as_str(), "user");
        assert_eq!(ChatRole::Model.as_str(), "model");
    }
}
