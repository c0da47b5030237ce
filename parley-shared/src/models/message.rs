/// Message model: the append-only log of a conversation
///
/// Messages are never updated or deleted. Their order is the insertion order,
/// carried by the store-assigned `id` (BIGSERIAL).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE messages (
///     id BIGSERIAL PRIMARY KEY,
///     conversation_id UUID NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
///     role VARCHAR(16) NOT NULL CHECK (role IN ('user', 'assistant', 'system')),
///     content TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    /// Converts role to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }

    /// Parses role from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            "system" => Some(MessageRole::System),
            _ => None,
        }
    }
}

/// A stored message
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    /// Store-assigned sequence; defines ordering within a conversation
    pub id: i64,

    pub conversation_id: Uuid,

    /// Role as stored ("user", "assistant" or "system")
    pub role: String,

    pub content: String,

    pub created_at: DateTime<Utc>,
}

/// Role/content pair as sent to the language model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }
}

impl Message {
    /// Gets the parsed role enum
    pub fn get_role(&self) -> Option<MessageRole> {
        MessageRole::from_str(&self.role)
    }

    /// Projects the message to the role/content pair the model sees
    ///
    /// Returns `None` for rows with an unknown role.
    pub fn to_chat_message(&self) -> Option<ChatMessage> {
        self.get_role()
            .map(|role| ChatMessage::new(role, self.content.clone()))
    }

    /// Projects an ordered log to its transcript (timestamps dropped)
    pub fn transcript(messages: &[Message]) -> Vec<ChatMessage> {
        messages.iter().filter_map(Message::to_chat_message).collect()
    }

    /// Appends one message inside an open transaction
    pub async fn append(
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: Uuid,
        message: &ChatMessage,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (conversation_id, role, content)
            VALUES ($1, $2, $3)
            RETURNING id, conversation_id, role, content, created_at
            "#,
        )
        .bind(conversation_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .fetch_one(&mut **tx)
        .await
    }

    /// Lists a conversation's messages in insertion order
    pub async fn list_by_conversation(
        pool: &PgPool,
        conversation_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, conversation_id, role, content, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, role: &str, content: &str) -> Message {
        Message {
            id,
            conversation_id: Uuid::nil(),
            role: role.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_string_conversion() {
        for role in [MessageRole::User, MessageRole::Assistant, MessageRole::System] {
            assert_eq!(MessageRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(MessageRole::from_str("tool"), None);
    }

    #[test]
    fn test_transcript_keeps_order_and_drops_timestamps() {
        let log = vec![row(1, "user", "hi"), row(2, "assistant", "hello"), row(3, "user", "bye")];

        let transcript = Message::transcript(&log);
        assert_eq!(
            transcript,
            vec![
                ChatMessage::user("hi"),
                ChatMessage::assistant("hello"),
                ChatMessage::user("bye"),
            ]
        );

        let json = serde_json::to_value(&transcript[0]).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_transcript_skips_unknown_roles() {
        let log = vec![row(1, "user", "hi"), row(2, "tool", "???")];
        assert_eq!(Message::transcript(&log).len(), 1);
    }
}
