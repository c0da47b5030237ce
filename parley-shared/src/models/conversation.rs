/// Conversation model and database operations
///
/// A conversation is owned by exactly one user and carries the metadata for a
/// message log kept in the `messages` table. Every write that appends to the
/// log also bumps `updated_at` inside the same transaction, so listing by
/// recency stays consistent with the log.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE conversations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::message::{ChatMessage, Message};

/// Conversation metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,

    /// Sole owner; other users never see this conversation
    pub owner_user_id: Uuid,

    /// Title generated from the first message
    pub title: String,

    pub created_at: DateTime<Utc>,

    /// Time of the most recent append
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a conversation
#[derive(Debug, Clone)]
pub struct CreateConversation {
    pub owner_user_id: Uuid,
    pub title: String,
}

impl Conversation {
    /// Creates a conversation and its first messages in one transaction
    ///
    /// Nothing is written if any insert fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use parley_shared::models::conversation::{Conversation, CreateConversation};
    /// # use parley_shared::models::message::ChatMessage;
    /// # use sqlx::PgPool;
    /// # use uuid::Uuid;
    /// # async fn example(pool: PgPool, owner: Uuid) -> Result<(), sqlx::Error> {
    /// let (conversation, messages) = Conversation::create_with_messages(
    ///     &pool,
    ///     CreateConversation { owner_user_id: owner, title: "Greetings".to_string() },
    ///     &[ChatMessage::user("hello"), ChatMessage::assistant("hi there")],
    /// ).await?;
    /// assert_eq!(messages.len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_with_messages(
        pool: &PgPool,
        data: CreateConversation,
        messages: &[ChatMessage],
    ) -> Result<(Self, Vec<Message>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (owner_user_id, title)
            VALUES ($1, $2)
            RETURNING id, owner_user_id, title, created_at, updated_at
            "#,
        )
        .bind(data.owner_user_id)
        .bind(data.title)
        .fetch_one(&mut *tx)
        .await?;

        let mut stored = Vec::with_capacity(messages.len());
        for message in messages {
            stored.push(Message::append(&mut tx, conversation.id, message).await?);
        }

        tx.commit().await?;

        Ok((conversation, stored))
    }

    /// Appends messages to an existing conversation and bumps `updated_at`
    ///
    /// Both happen in one transaction.
    ///
    /// # Returns
    ///
    /// The stored messages, or `RowNotFound` if the conversation is gone
    pub async fn append_messages(
        pool: &PgPool,
        id: Uuid,
        messages: &[ChatMessage],
    ) -> Result<Vec<Message>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let touched = sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if touched.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        let mut stored = Vec::with_capacity(messages.len());
        for message in messages {
            stored.push(Message::append(&mut tx, id, message).await?);
        }

        tx.commit().await?;

        Ok(stored)
    }

    /// Finds a conversation only if it belongs to `owner_user_id`
    pub async fn find_owned(
        pool: &PgPool,
        id: Uuid,
        owner_user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, owner_user_id, title, created_at, updated_at
            FROM conversations
            WHERE id = $1 AND owner_user_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_user_id)
        .fetch_optional(pool)
        .await
    }

    /// Lists a user's conversations, most recently updated first
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, owner_user_id, title, created_at, updated_at
            FROM conversations
            WHERE owner_user_id = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(owner_user_id)
        .fetch_all(pool)
        .await
    }
}
