//! The chat-to-action pipeline — the heart of Minebrain.
//!
//! One operator request flows through these stages:
//!
//! 1. **Filter** the chat line (prefix, sender, allowlist)
//! 2. **Snapshot** the world through the game client
//! 3. **Infer**: history + snapshot + request go to the completion provider
//! 4. **Parse** the reply into commands, one per line
//! 5. **Dispatch** each command to its action handler
//!
//! Parse errors and handler failures are reported per line and never stop
//! the rest of the batch.

pub mod context;
pub mod dispatcher;
pub mod inference;
pub mod parser;
pub mod pipeline;

pub use context::{seed_prompt, ContextStore, SnapshotBuilder, Visibility, WorldSnapshot};
pub use dispatcher::ActionDispatcher;
pub use inference::{actionable_segment, InferenceClient};
pub use parser::{parse, parse_line};
pub use pipeline::{ChatPipeline, PipelineSettings, Turn};

#[cfg(test)]
pub(crate) mod test_support;
