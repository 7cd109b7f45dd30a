//! AI client trait and the shared chat session.
//!
//! The session is the single dialogue context held with the remote AI for
//! the process lifetime. Concurrent generation workers queue on the
//! send/receive section through the session mutex.

use crate::{CompanionError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Role of a message within the chat history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Model,
}

/// One entry in the chat history sent to the remote AI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Opaque remote AI client.
///
/// Implementations hold their own per-process configuration (model
/// identifier, sampling parameters, system instruction) set once at
/// startup.
pub trait AiClient: Send + Sync {
    /// Generate a reply for the given chat history. The last entry is the
    /// pending user message.
    fn generate(&self, history: &[ChatMessage]) -> Result<String>;
}

/// Stand-in for a client that failed to initialize at startup. Every
/// call reports the original fault, rendered through the normal error
/// notice path.
pub struct DisabledClient {
    reason: String,
}

impl DisabledClient {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl AiClient for DisabledClient {
    fn generate(&self, _history: &[ChatMessage]) -> Result<String> {
        Err(CompanionError::AiError(self.reason.clone()))
    }
}

struct SessionInner {
    client: Box<dyn AiClient>,
    history: Vec<ChatMessage>,
}

/// The single ongoing dialogue context.
///
/// `send` locks the session for the full send/receive round trip, so
/// back-to-back requests queue rather than interleave on the remote
/// session state.
pub struct ChatSession {
    inner: Mutex<SessionInner>,
}

impl ChatSession {
    pub fn new(client: Box<dyn AiClient>) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                client,
                history: Vec::new(),
            }),
        }
    }

    /// Send one user message and return the assistant reply.
    ///
    /// On failure the pending user message is rolled back so the history
    /// only ever contains completed exchanges.
    pub fn send(&self, text: &str) -> Result<String> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.history.push(ChatMessage::user(text));
        match inner.client.generate(&inner.history) {
            Ok(reply) => {
                inner.history.push(ChatMessage::model(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                inner.history.pop();
                Err(e)
            }
        }
    }

    /// Number of completed messages in the session history.
    pub fn history_len(&self) -> usize {
        self.inner.lock().history.len()
    }
}
