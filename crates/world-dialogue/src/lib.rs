//! Conversation bridge for the world simulation.
//!
//! Provider-agnostic dialogue generation: a backend trait with per-call
//! timeouts, a guardrail state machine that validates generated turns, and a
//! concurrency governor that caps simultaneous external calls. The simulation
//! engine consumes this crate through [`ConversationBridge`]; actual model
//! access lives behind [`DialogueBackend`].

pub mod backend;
pub mod bridge;
pub mod governor;
pub mod guardrail;

pub use backend::{OllamaBackend, ScriptedBackend, DEFAULT_OLLAMA_URL};
pub use bridge::{
    ConversationBridge, DialogueOutcome, DialogueSpec, PersonaCard, TurnDraft,
};
pub use governor::ChatGovernor;
pub use guardrail::{GateDecision, GuardrailPolicy, TurnGate, TurnState, Violation};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role of a message in a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of the ordered history sent to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A single external generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier, e.g. `tinyllama:1.1b`.
    pub model: String,
    /// System prompt plus ordered message history.
    pub messages: Vec<ChatMessage>,
}

/// Errors from the external generation backend.
#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    #[error("backend request failed: {0}")]
    Request(String),

    #[error("backend call timed out after {0} ms")]
    Timeout(u64),

    #[error("backend returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// External dialogue-generation capability.
///
/// Implementations must be thread-safe; calls may run concurrently up to the
/// governor's cap. The per-call timeout is enforced by the bridge, but
/// backends are free to carry their own tighter transport timeouts.
#[async_trait]
pub trait DialogueBackend: Send + Sync {
    /// Generate one response for the given request.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, DialogueError>;
}
