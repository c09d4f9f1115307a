//! The chat pipeline: one operator request in, one batch of actions out.

use minebrain_config::AppConfig;
use minebrain_core::{
    clip_chat, ActionContext, ActionLimits, ChatEvent, DomainEvent, Error, EventBus, GameClient, HandlerRegistry,
    Provider,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::context::{seed_prompt, ContextStore, SnapshotBuilder, Visibility};
use crate::dispatcher::ActionDispatcher;
use crate::inference::{InferenceClient, DEFAULT_DELIMITER};
use crate::parser;

/// Knobs for one pipeline, usually taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Chat prefix that marks a request for the agent
    pub prefix: String,
    /// Said before calling the model; `None` stays silent
    pub processing_notice: Option<String>,
    /// Senders allowed to give orders; empty allows everyone
    pub operators: Vec<String>,
    /// Echo unparseable reply lines to chat
    pub report_parse_errors: bool,
    /// Echo handler failures to chat
    pub report_failures: bool,
    pub visibility: Visibility,
    /// History entries kept beyond the seed; 0 keeps everything
    pub max_entries: usize,
    /// Reply delimiter; `None` uses the whole reply
    pub reply_delimiter: Option<String>,
    pub limits: ActionLimits,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            prefix: "!".into(),
            processing_notice: Some("Processing..".into()),
            operators: Vec::new(),
            report_parse_errors: true,
            report_failures: true,
            visibility: Visibility::Restricted,
            max_entries: 40,
            reply_delimiter: Some(DEFAULT_DELIMITER.into()),
            limits: ActionLimits::default(),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let notice = config.chat.processing_notice.trim();
        Self {
            prefix: config.chat.prefix.clone(),
            processing_notice: (!notice.is_empty()).then(|| notice.to_string()),
            operators: config.chat.operators.clone(),
            report_parse_errors: config.chat.report_parse_errors,
            report_failures: config.chat.report_failures,
            visibility: Visibility::from_admin(config.admin),
            max_entries: config.context.max_entries,
            reply_delimiter: config.inference.delimiter().map(str::to_string),
            limits: config.actions.limits(),
        }
    }
}

/// What became of one chat event.
#[derive(Debug)]
pub enum Turn {
    /// Not addressed to the agent.
    Ignored,
    /// No batch was produced; the operator was told why.
    Failed(Error),
    /// The reply was parsed and its commands dispatched.
    Dispatched {
        reply: String,
        commands: usize,
        rejected: usize,
    },
}

pub struct ChatPipeline {
    game: Arc<dyn GameClient>,
    context: Arc<ContextStore>,
    snapshots: SnapshotBuilder,
    inference: InferenceClient,
    dispatcher: Arc<ActionDispatcher>,
    events: Arc<EventBus>,
    settings: PipelineSettings,
}

impl ChatPipeline {
    /// Wire up a pipeline. Must be called inside a Tokio runtime.
    pub fn new(
        game: Arc<dyn GameClient>,
        provider: Arc<dyn Provider>,
        registry: HandlerRegistry,
        settings: PipelineSettings,
    ) -> Self {
        let seed = seed_prompt(game.username(), &registry);
        let context = Arc::new(ContextStore::new(seed, settings.max_entries));
        let events = Arc::new(EventBus::default());
        let ctx = ActionContext::new(game.clone(), settings.limits.clone());
        let dispatcher = Arc::new(ActionDispatcher::new(
            registry,
            ctx,
            events.clone(),
            settings.report_failures,
        ));
        let inference = InferenceClient::new(provider).with_delimiter(settings.reply_delimiter.clone());

        Self {
            snapshots: SnapshotBuilder::new(game.clone()),
            game,
            context,
            inference,
            dispatcher,
            events,
            settings,
        }
    }

    /// Build a pipeline with the built-in handlers, minus any disabled in
    /// `config`.
    pub fn from_config(config: &AppConfig, game: Arc<dyn GameClient>, provider: Arc<dyn Provider>) -> Self {
        let registry = minebrain_actions::default_registry(&config.actions.disabled);
        Self::new(game, provider, registry, PipelineSettings::from_config(config))
    }

    pub fn context(&self) -> &Arc<ContextStore> {
        &self.context
    }

    pub fn dispatcher(&self) -> &Arc<ActionDispatcher> {
        &self.dispatcher
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// The request text if `event` is addressed to the agent: prefixed, not
    /// sent by the agent itself, from an allowed operator, and non-blank.
    pub fn request_from(&self, event: &ChatEvent) -> Option<String> {
        if event.sender.eq_ignore_ascii_case(self.game.username()) {
            return None;
        }
        let request = event.message.strip_prefix(self.settings.prefix.as_str())?.trim();
        if request.is_empty() {
            return None;
        }
        let allowed = self.settings.operators.is_empty()
            || self
                .settings
                .operators
                .iter()
                .any(|op| op.eq_ignore_ascii_case(&event.sender));
        if !allowed {
            debug!(sender = %event.sender, "Ignoring request from non-operator");
            return None;
        }
        Some(request.to_string())
    }

    /// Tell the server the agent is listening.
    pub async fn announce(&self) {
        let prefix = &self.settings.prefix;
        let line = format!(
            "-- {} is online! Type \"{prefix}\" with your message to begin! Example \"{prefix}Hello!\" --",
            self.game.username()
        );
        self.say(&line).await;
    }

    /// Run one full turn for a chat event.
    pub async fn handle(&self, event: ChatEvent) -> Turn {
        let Some(request) = self.request_from(&event) else {
            return Turn::Ignored;
        };

        info!(sender = %event.sender, %request, "Request accepted");
        self.events.publish(DomainEvent::RequestAccepted {
            sender: event.sender.clone(),
            request_preview: request.chars().take(80).collect(),
            timestamp: chrono::Utc::now(),
        });

        if let Some(notice) = &self.settings.processing_notice {
            self.say(notice).await;
        }

        let snapshot = match self.snapshots.build(self.settings.visibility).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "World snapshot failed");
                self.say(&format!("Error: {e}")).await;
                return Turn::Failed(e.into());
            }
        };

        let user_entry = format!("{}: {request}", event.sender);
        let history = self.context.snapshot().await;

        let started = Instant::now();
        let reply = match self.inference.complete(&history, &snapshot, &user_entry).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Inference failed");
                self.events.publish(DomainEvent::InferenceFailed {
                    error_message: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                self.say(&format!("Error: {e}")).await;
                return Turn::Failed(e.into());
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        self.context.append_turn(user_entry, reply.clone()).await;

        let mut commands = Vec::new();
        let mut rejected = 0;
        for result in parser::parse(&reply) {
            match result {
                Ok(command) => commands.push(command),
                Err(e) => {
                    rejected += 1;
                    warn!(line_number = e.line_number, line = %e.line, reason = %e.kind, "Reply line rejected");
                    self.events.publish(DomainEvent::CommandRejected {
                        line: e.line.clone(),
                        reason: e.kind.to_string(),
                        timestamp: chrono::Utc::now(),
                    });
                    if self.settings.report_parse_errors {
                        self.say(&e.chat_message()).await;
                    }
                }
            }
        }

        let count = commands.len();
        info!(commands = count, rejected, duration_ms, "Reply parsed");
        self.events.publish(DomainEvent::InferenceCompleted {
            commands: count,
            rejected_lines: rejected,
            duration_ms,
            timestamp: chrono::Utc::now(),
        });

        self.dispatcher.run(commands).await;
        Turn::Dispatched {
            reply,
            commands: count,
            rejected,
        }
    }

    /// Serve chat until the source closes. Each accepted request is handled
    /// on its own task so a slow model call never blocks the next message.
    pub async fn run(self: Arc<Self>, mut chat: broadcast::Receiver<ChatEvent>) {
        loop {
            match chat.recv().await {
                Ok(event) => {
                    if self.request_from(&event).is_none() {
                        continue;
                    }
                    let pipeline = self.clone();
                    tokio::spawn(async move {
                        pipeline.handle(event).await;
                    });
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Chat receiver lagged, messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        info!("Chat source closed");
    }

    async fn say(&self, text: &str) {
        if let Err(e) = self.game.chat(clip_chat(text)).await {
            warn!(error = %e, "Failed to send chat");
        }
    }
}
