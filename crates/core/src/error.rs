//! Error types for the Minebrain domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant. None of them is fatal
//! to the process: the pipeline reports them and keeps serving chat.

use thiserror::Error;

/// The error a chat turn ends with when no batch could be produced.
#[derive(Debug, Error)]
pub enum Error {
    // --- Inference errors ---
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    // --- Game client errors ---
    #[error("Game error: {0}")]
    Game(#[from] GameError),
}

// --- Bounded context errors ---

/// Failure of a single completion round-trip.
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("completion endpoint returned {status_code}: {message}")]
    Status { status_code: u16, message: String },

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("completion endpoint not configured: {0}")]
    NotConfigured(String),

    #[error("completion request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),
}

/// A capability call rejected by the game client.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("{0}")]
    Rejected(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("game client disconnected: {0}")]
    Disconnected(String),

    #[error("bridge protocol error: {0}")]
    Protocol(String),

    #[error("game request timed out after {0}s")]
    Timeout(u64),
}

/// Handler-level failure. Always reported, never fatal.
#[derive(Debug, Clone, Error)]
pub enum ActionError {
    /// A target, player, chest or slot could not be resolved. The message is
    /// user-facing and is said in chat verbatim.
    #[error("{0}")]
    Unresolved(String),

    #[error("{verb} failed: {reason}")]
    Failed { verb: String, reason: String },

    #[error(transparent)]
    Game(#[from] GameError),

    #[error("{0} is disabled")]
    Disabled(String),

    #[error("{verb} handler panicked")]
    Panicked { verb: String },
}

impl ActionError {
    pub fn failed(verb: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            verb: verb.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is a resolution failure (something could not be found)
    /// rather than a rejected or crashed action.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Unresolved(_) | Self::Game(GameError::NotFound(_)))
    }
}
