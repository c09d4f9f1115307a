//! Action handler trait — the abstraction over command execution.
//!
//! Each verb has one handler. Handlers translate a [`Command`] into calls on
//! the [`GameClient`] capability and report an outcome or an [`ActionError`].
//! They are registered in a [`HandlerRegistry`] which the dispatcher and the
//! grammar prompt both read from.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::command::{Command, Verb};
use crate::error::ActionError;
use crate::game::GameClient;

/// How the dispatcher sequences a handler relative to later commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Started in order; later commands do not wait for it to finish.
    FireAndForget,
    /// Later commands wait until it has finished.
    AwaitCompletion,
    /// Runs as a background task until its own termination condition.
    LongRunning,
}

/// What a successful handler reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Log line describing what happened
    pub detail: String,

    /// Optional chat acknowledgement for the operator
    pub announce: Option<String>,
}

impl ActionOutcome {
    pub fn quiet(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            announce: None,
        }
    }

    pub fn announced(detail: impl Into<String>, chat: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            announce: Some(chat.into()),
        }
    }
}

/// Lifecycle state of an [`ActionTask`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Ongoing,
    Succeeded,
    Failed(String),
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed(_))
    }
}

/// The dispatcher's unit of execution: one command and its status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionTask {
    pub id: Uuid,
    pub command: Command,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

impl ActionTask {
    pub fn new(command: Command) -> Self {
        Self {
            id: Uuid::new_v4(),
            command,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn verb(&self) -> Verb {
        self.command.verb()
    }
}

/// Numeric bounds handlers work within.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionLimits {
    /// Delay between KILL attack polls
    pub kill_interval: Duration,
    /// KILL gives up after this many attacks
    pub kill_max_attempts: u32,
    /// KILL gives up after this long
    pub kill_max_duration: Duration,
    /// Largest BUILD edge length accepted
    pub build_max_size: u32,
    /// MINE ray length
    pub mine_reach: f64,
    /// STORE chest search radius
    pub chest_radius: f64,
    /// PLACE looks this many blocks out along each face
    pub place_reach: i32,
}

impl Default for ActionLimits {
    fn default() -> Self {
        Self {
            kill_interval: Duration::from_millis(500),
            kill_max_attempts: 120,
            kill_max_duration: Duration::from_secs(60),
            build_max_size: 16,
            mine_reach: 5.0,
            chest_radius: 10.0,
            place_reach: 2,
        }
    }
}

/// Everything a handler may touch.
#[derive(Clone)]
pub struct ActionContext {
    pub game: Arc<dyn GameClient>,
    pub limits: ActionLimits,
}

impl ActionContext {
    pub fn new(game: Arc<dyn GameClient>, limits: ActionLimits) -> Self {
        Self { game, limits }
    }
}

/// The core ActionHandler trait.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// The verb this handler serves.
    fn verb(&self) -> Verb;

    /// Grammar line shown to the model, e.g. `BUILD <size> <slotId>`.
    fn usage(&self) -> &str;

    /// What the command does (shown to the model).
    fn description(&self) -> &str;

    fn mode(&self) -> ExecutionMode;

    /// Run the command to completion (or termination, for long-running ones).
    async fn execute(&self, command: &Command, ctx: &ActionContext) -> Result<ActionOutcome, ActionError>;

    /// One line of the command grammar.
    fn grammar_line(&self) -> String {
        format!("- {}: {}", self.usage(), self.description())
    }
}

/// A registry of enabled action handlers, ordered by verb.
pub struct HandlerRegistry {
    handlers: BTreeMap<Verb, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Register a handler. Replaces any existing handler for the same verb.
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(handler.verb(), handler);
    }

    /// Remove the handler for a verb, returning whether one was registered.
    pub fn disable(&mut self, verb: Verb) -> bool {
        self.handlers.remove(&verb).is_some()
    }

    pub fn get(&self, verb: Verb) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&verb).cloned()
    }

    /// Enabled verbs in grammar order.
    pub fn verbs(&self) -> Vec<Verb> {
        self.handlers.keys().copied().collect()
    }

    /// Grammar lines for every enabled handler, in grammar order.
    pub fn grammar(&self) -> Vec<String> {
        self.handlers.values().map(|h| h.grammar_line()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Clip chat text to the server's message length, on a char boundary.
pub fn clip_chat(text: &str) -> &str {
    match text.char_indices().nth(crate::command::MAX_SAY_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHandler(Verb);

    #[async_trait]
    impl ActionHandler for NoopHandler {
        fn verb(&self) -> Verb {
            self.0
        }

        fn usage(&self) -> &str {
            "MINE"
        }

        fn description(&self) -> &str {
            "Does nothing."
        }

        fn mode(&self) -> ExecutionMode {
            ExecutionMode::FireAndForget
        }

        async fn execute(&self, _command: &Command, _ctx: &ActionContext) -> Result<ActionOutcome, ActionError> {
            Ok(ActionOutcome::quiet("noop"))
        }
    }

    #[test]
    fn registry_orders_by_verb() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(NoopHandler(Verb::Hold)));
        registry.register(Arc::new(NoopHandler(Verb::Say)));
        registry.register(Arc::new(NoopHandler(Verb::Mine)));
        assert_eq!(registry.verbs(), vec![Verb::Say, Verb::Mine, Verb::Hold]);
    }

    #[test]
    fn registry_disable_removes_handler() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(NoopHandler(Verb::Kill)));
        assert!(registry.disable(Verb::Kill));
        assert!(!registry.disable(Verb::Kill));
        assert!(registry.get(Verb::Kill).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn grammar_line_joins_usage_and_description() {
        let handler = NoopHandler(Verb::Mine);
        assert_eq!(handler.grammar_line(), "- MINE: Does nothing.");
    }

    #[test]
    fn clip_chat_respects_char_boundaries() {
        let long = "é".repeat(300);
        let clipped = clip_chat(&long);
        assert_eq!(clipped.chars().count(), 256);
        assert_eq!(clip_chat("short"), "short");
    }

    #[test]
    fn terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Ongoing.is_terminal());
        assert!(TaskStatus::Succeeded.is_terminal());
        assert!(TaskStatus::Failed("x".into()).is_terminal());
    }
}
