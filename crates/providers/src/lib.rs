//! Completion provider implementations for Minebrain.
//!
//! All providers implement the `minebrain_core::Provider` trait.

pub mod chat_completions;

pub use chat_completions::ChatCompletionsProvider;
