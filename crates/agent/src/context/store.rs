//! Context Store — the running conversation fed to the model.
//!
//! The seed system entry is held apart from the history so that window
//! trimming can never reach it. Every read and write goes through one async
//! mutex, so a prompt is never assembled from a half-appended turn.

use minebrain_core::{ConversationEntry, Role};
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct Window {
    seed: ConversationEntry,
    history: VecDeque<ConversationEntry>,
    /// Maximum history entries kept beyond the seed; 0 keeps everything.
    max_entries: usize,
}

impl Window {
    fn push(&mut self, entry: ConversationEntry) {
        self.history.push_back(entry);
        self.trim();
    }

    /// Drop the oldest entries until the window fits. A window never
    /// starts with an orphaned assistant reply.
    fn trim(&mut self) {
        if self.max_entries == 0 {
            return;
        }
        let mut dropped = 0;
        while self.history.len() > self.max_entries {
            self.history.pop_front();
            dropped += 1;
        }
        while self.history.front().is_some_and(|e| e.role == Role::Assistant) {
            self.history.pop_front();
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, kept = self.history.len(), "Context window trimmed");
        }
    }
}

/// The conversation for one agent session.
pub struct ContextStore {
    window: Mutex<Window>,
}

impl ContextStore {
    /// Create a store seeded with the command-grammar system prompt.
    pub fn new(seed: impl Into<String>, max_entries: usize) -> Self {
        Self {
            window: Mutex::new(Window {
                seed: ConversationEntry::system(seed),
                history: VecDeque::new(),
                max_entries,
            }),
        }
    }

    /// Append one entry to the history.
    ///
    /// System entries are only accepted as the seed; any other system entry
    /// is dropped with a warning.
    pub async fn append(&self, entry: ConversationEntry) {
        if entry.role == Role::System {
            warn!("Ignoring system entry appended after the seed");
            return;
        }
        self.window.lock().await.push(entry);
    }

    /// Append a completed request/reply pair under one lock.
    pub async fn append_turn(&self, user: impl Into<String>, assistant: impl Into<String>) {
        let mut window = self.window.lock().await;
        window.history.push_back(ConversationEntry::user(user));
        window.push(ConversationEntry::assistant(assistant));
    }

    /// The full conversation, seed first.
    pub async fn snapshot(&self) -> Vec<ConversationEntry> {
        let window = self.window.lock().await;
        std::iter::once(window.seed.clone())
            .chain(window.history.iter().cloned())
            .collect()
    }

    /// Number of history entries, not counting the seed.
    pub async fn len(&self) -> usize {
        self.window.lock().await.history.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Forget every turn but keep the seed.
    pub async fn clear_history(&self) {
        self.window.lock().await.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn snapshot_starts_with_seed() {
        let store = ContextStore::new("grammar", 0);
        store.append_turn("Alex: hi", "SAY hello").await;

        let entries = store.snapshot().await;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].role, Role::System);
        assert_eq!(entries[0].content, "grammar");
        assert_eq!(entries[1].role, Role::User);
        assert_eq!(entries[2].role, Role::Assistant);
    }

    #[tokio::test]
    async fn window_drops_oldest_turns_but_never_the_seed() {
        let store = ContextStore::new("grammar", 4);
        for i in 0..5 {
            store.append_turn(format!("u{i}"), format!("a{i}")).await;
        }

        let entries = store.snapshot().await;
        assert_eq!(entries[0].content, "grammar");
        let history: Vec<_> = entries[1..].iter().map(|e| e.content.as_str()).collect();
        assert_eq!(history, vec!["u3", "a3", "u4", "a4"]);
    }

    #[tokio::test]
    async fn odd_window_never_starts_with_a_reply() {
        let store = ContextStore::new("grammar", 3);
        store.append_turn("u0", "a0").await;
        store.append_turn("u1", "a1").await;

        let entries = store.snapshot().await;
        assert_eq!(entries[1].role, Role::User);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn zero_means_unbounded() {
        let store = ContextStore::new("grammar", 0);
        for i in 0..100 {
            store.append_turn(format!("u{i}"), format!("a{i}")).await;
        }
        assert_eq!(store.len().await, 200);
    }

    #[tokio::test]
    async fn appended_system_entries_are_ignored() {
        let store = ContextStore::new("grammar", 0);
        store.append(ConversationEntry::system("sneaky")).await;
        store.append(ConversationEntry::user("Alex: hi")).await;
        assert_eq!(store.len().await, 1);
        assert_eq!(store.snapshot().await[1].content, "Alex: hi");
    }

    #[tokio::test]
    async fn clear_history_keeps_seed() {
        let store = ContextStore::new("grammar", 0);
        store.append_turn("u", "a").await;
        store.clear_history().await;
        assert!(store.is_empty().await);
        assert_eq!(store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_turns_stay_paired() {
        let store = Arc::new(ContextStore::new("grammar", 0));
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append_turn(format!("u{i}"), format!("a{i}")).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let entries = store.snapshot().await;
        for pair in entries[1..].chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
    }
}
