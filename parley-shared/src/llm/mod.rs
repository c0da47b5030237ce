/// Language model client
///
/// [`ChatModel`] is the seam the chat relay talks to. Two implementations:
///
/// - [`http::HttpChatModel`]: an OpenAI-compatible chat-completion endpoint
///   (Mistral by default) over `reqwest`
/// - [`scripted::ScriptedChatModel`]: canned replies for tests
///
/// # Example
///
/// ```no_run
/// use parley_shared::llm::{http::HttpChatModel, ChatModel, LlmConfig};
/// use parley_shared::models::message::ChatMessage;
///
/// # async fn example() -> Result<(), parley_shared::llm::LlmError> {
/// let model = HttpChatModel::new(LlmConfig::default())?;
/// let reply = model.complete(&[ChatMessage::user("hello")]).await?;
/// # Ok(())
/// # }
/// ```

pub mod http;
pub mod scripted;

use async_trait::async_trait;

use crate::models::message::ChatMessage;

/// System prompt prefixed to every chat transcript
pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// System prompt for title generation; the user's first message follows as
/// the user turn
pub const TITLE_SYSTEM_PROMPT: &str = "Generate a concise title for the following conversation:\n";

/// Title used when the model returns nothing usable
pub const DEFAULT_TITLE: &str = "New Chat";

/// Model endpoint and sampling settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub title_temperature: f32,
    pub title_max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.mistral.ai/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "mistral-small-latest".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            title_temperature: 0.3,
            title_max_tokens: 20,
        }
    }
}

/// Error type for model calls
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Non-success HTTP status from the provider
    #[error("Error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request to language model failed: {0}")]
    Transport(String),

    #[error("Malformed language model response: {0}")]
    Decode(String),

    #[error("Language model returned no choices")]
    EmptyResponse,
}

/// Chat-completion model
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generates the assistant reply to a transcript
    ///
    /// `transcript` excludes the system prompt; implementations add it.
    async fn complete(&self, transcript: &[ChatMessage]) -> Result<String, LlmError>;

    /// Generates a raw title for a conversation starting with `first_message`
    async fn generate_title(&self, first_message: &str) -> Result<String, LlmError>;
}

/// Trims whitespace and surrounding quotes; falls back to [`DEFAULT_TITLE`]
pub fn clean_title(raw: &str) -> String {
    let title = raw.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();

    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title.to_string()
    }
}

/// Prefixes a transcript with the chat system prompt
pub fn with_system_prompt(transcript: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(transcript.len() + 1);
    messages.push(ChatMessage::system(CHAT_SYSTEM_PROMPT));
    messages.extend_from_slice(transcript);
    messages
}
