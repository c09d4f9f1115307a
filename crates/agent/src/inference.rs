//! Inference Client — one completion round-trip per operator request.

use minebrain_core::{ConversationEntry, InferenceError, Provider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::context::WorldSnapshot;

/// Default separator between the model's monologue and its actionable reply.
pub const DEFAULT_DELIMITER: &str = "$@$";

/// The text after the last `delimiter`, or all of `raw` when there is no
/// delimiter rule or the delimiter does not occur.
pub fn actionable_segment<'a>(raw: &'a str, delimiter: Option<&str>) -> &'a str {
    match delimiter {
        Some(delimiter) if !delimiter.is_empty() => raw.rsplit(delimiter).next().unwrap_or(raw),
        _ => raw,
    }
}

pub struct InferenceClient {
    provider: Arc<dyn Provider>,
    delimiter: Option<String>,
}

impl InferenceClient {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            delimiter: Some(DEFAULT_DELIMITER.to_string()),
        }
    }

    /// Set the reply delimiter; `None` keeps the whole reply.
    pub fn with_delimiter(mut self, delimiter: Option<String>) -> Self {
        self.delimiter = delimiter.filter(|d| !d.is_empty());
        self
    }

    /// The request payload: history, then the snapshot as a system entry,
    /// then the new user entry.
    pub fn assemble(
        history: &[ConversationEntry],
        snapshot: &WorldSnapshot,
        user_message: &str,
    ) -> Vec<ConversationEntry> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.extend_from_slice(history);
        messages.push(ConversationEntry::system(snapshot.render()));
        messages.push(ConversationEntry::user(user_message));
        messages
    }

    /// Ask the provider for a reply and return its actionable segment.
    pub async fn complete(
        &self,
        history: &[ConversationEntry],
        snapshot: &WorldSnapshot,
        user_message: &str,
    ) -> Result<String, InferenceError> {
        let messages = Self::assemble(history, snapshot, user_message);
        debug!(provider = self.provider.name(), messages = messages.len(), "Sending completion request");

        let started = Instant::now();
        let raw = self.provider.complete(&messages).await?;
        let reply = actionable_segment(&raw, self.delimiter.as_deref());

        info!(
            provider = self.provider.name(),
            duration_ms = started.elapsed().as_millis() as u64,
            raw_chars = raw.len(),
            reply_lines = reply.lines().count(),
            "Completion received"
        );
        Ok(reply.to_string())
    }
}
