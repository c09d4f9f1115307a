use async_trait::async_trait;
use minebrain_core::{ConversationEntry, InferenceError, Provider};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A provider that returns scripted replies in order and records every
/// request it was sent.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, InferenceError>>>,
    requests: Mutex<Vec<Vec<ConversationEntry>>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: InferenceError) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(error)])),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn requests(&self) -> Vec<Vec<ConversationEntry>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[ConversationEntry]) -> Result<String, InferenceError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InferenceError::MalformedResponse("script exhausted".into())))
    }
}
