/// Scripted chat model for tests
///
/// Replies with a fixed title and echoes the last user turn, recording every
/// transcript it was given. Can be switched into a failing mode.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{with_system_prompt, ChatModel, LlmError};
use crate::models::message::{ChatMessage, MessageRole};

#[derive(Debug)]
pub struct ScriptedChatModel {
    title: String,
    failing: AtomicBool,
    failing_titles: AtomicBool,
    transcripts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChatModel {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            failing: AtomicBool::new(false),
            failing_titles: AtomicBool::new(false),
            transcripts: Mutex::new(Vec::new()),
        }
    }

    /// Fails every completion with a 503
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fails title generation only
    pub fn set_failing_titles(&self, failing: bool) {
        self.failing_titles.store(failing, Ordering::SeqCst);
    }

    /// The reply produced for a given user message
    pub fn reply_to(text: &str) -> String {
        format!("Echo: {}", text)
    }

    /// Full message lists sent to `complete`, system prompt included
    pub async fn transcripts(&self) -> Vec<Vec<ChatMessage>> {
        self.transcripts.lock().await.clone()
    }

    fn unavailable() -> LlmError {
        LlmError::Status {
            status: 503,
            body: "service unavailable".to_string(),
        }
    }
}

impl Default for ScriptedChatModel {
    fn default() -> Self {
        Self::new("Scripted Title")
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, transcript: &[ChatMessage]) -> Result<String, LlmError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        self.transcripts
            .lock()
            .await
            .push(with_system_prompt(transcript));

        let last_user = transcript
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        Ok(Self::reply_to(last_user))
    }

    async fn generate_title(&self, _first_message: &str) -> Result<String, LlmError> {
        if self.failing.load(Ordering::SeqCst) || self.failing_titles.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        Ok(format!("\"{}\"", self.title))
    }
}
