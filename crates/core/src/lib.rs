//! # Minebrain Core
//!
//! Domain types, traits, and error definitions for Minebrain, a chat-driven
//! game agent that turns language-model replies into world actions.
//! This crate has **zero framework dependencies** — it defines the domain model
//! that all other crates implement against.
//!
//! ## Seams
//!
//! - [`Provider`] — the completion backend
//! - [`GameClient`] — the game session capability set
//! - [`ActionHandler`] — one per command verb
//!
//! Everything else (bridge clients, HTTP providers, handlers, the pipeline)
//! depends inward on these.

pub mod error;
pub mod message;
pub mod provider;
pub mod game;
pub mod command;
pub mod action;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{ActionError, Error, GameError, InferenceError};
pub use message::{ConversationEntry, Role};
pub use provider::Provider;
pub use game::{
    AgentStatus, AuthMode, Block, BlockPos, ChatEvent, ContainerId, EntityFilter, EntityId,
    EntityInfo, Face, GameClient, ItemStack, LoginOptions, PlayerInfo, Vec3,
};
pub use command::{Command, ParseError, ParseErrorKind, Target, Verb, MAX_SAY_CHARS};
pub use action::{
    clip_chat, ActionContext, ActionHandler, ActionLimits, ActionOutcome, ActionTask,
    ExecutionMode, HandlerRegistry, TaskStatus,
};
pub use event::{DomainEvent, EventBus};
