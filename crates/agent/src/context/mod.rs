//! What the model sees on every turn.
//!
//! | Part | Source | Lifetime |
//! |------|--------|----------|
//! | Seed | Command grammar from the handler registry | Whole session, never trimmed |
//! | History | Past requests and replies | Bounded window, oldest turn dropped first |
//! | Snapshot | Game client, read-only | One call, then discarded |

pub mod prompt;
pub mod snapshot;
pub mod store;

pub use prompt::seed_prompt;
pub use snapshot::{SnapshotBuilder, Visibility, WorldSnapshot};
pub use store::ContextStore;
