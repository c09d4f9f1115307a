//! Provider trait — the abstraction over completion backends.
//!
//! A Provider knows how to send an ordered conversation to a language model
//! and get the reply text back. It does not interpret the reply.
//!
//! Implementations: OpenAI-compatible chat completions endpoints (Ollama,
//! llama.cpp server, vLLM, hosted APIs), and scripted providers in tests.

use async_trait::async_trait;

use crate::error::InferenceError;
use crate::message::ConversationEntry;

/// The core Provider trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable name of this provider (for logs).
    fn name(&self) -> &str;

    /// Send the full message sequence and return the raw assistant content.
    async fn complete(&self, messages: &[ConversationEntry]) -> Result<String, InferenceError>;
}
