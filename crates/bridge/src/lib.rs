//! Game client implementations for Minebrain.
//!
//! Each implementation provides the `minebrain_core::GameClient` capability
//! set the handlers act through.
//!
//! Available clients:
//! - **Remote** — JSON-lines over TCP to a game-side bridge process
//! - **Sim** — in-memory world for offline runs and tests
//!
//! Plus a **console** chat source that turns terminal lines into chat events.

pub mod console;
pub mod protocol;
pub mod remote;
pub mod sim;

pub use remote::RemoteGameClient;
pub use sim::{GameCall, SimWorld};
