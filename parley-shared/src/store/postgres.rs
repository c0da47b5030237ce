/// Postgres-backed store
///
/// Thin adapter from the store traits to the queries in `crate::models`.
/// Writes that must not land half-way (conversation + messages) run in a
/// single transaction inside the model functions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ConversationStore, StoreError, StoreResult, UserStore};
use crate::models::{
    conversation::{Conversation, CreateConversation},
    message::{ChatMessage, Message},
    user::{CreateUser, User},
};

/// Store over a shared connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps "zero rows updated" to `StoreError::NotFound`
fn require_row(updated: bool) -> StoreResult<()> {
    if updated {
        Ok(())
    } else {
        Err(StoreError::NotFound)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_user_by_reset_token(&self, id: Uuid, token: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_reset_token(&self.pool, id, token).await?)
    }

    async fn set_verification_code(
        &self,
        id: Uuid,
        code: Option<&str>,
        expiry: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        require_row(User::set_verification_code(&self.pool, id, code, expiry).await?)
    }

    async fn mark_email_verified(&self, id: Uuid) -> StoreResult<()> {
        require_row(User::mark_email_verified(&self.pool, id).await?)
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: Option<&str>,
        expiry: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        require_row(User::set_reset_token(&self.pool, id, token, expiry).await?)
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        require_row(User::set_password(&self.pool, id, password_hash).await?)
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        require_row(User::update_last_login(&self.pool, id).await?)
    }
}

#[async_trait]
impl ConversationStore for PgStore {
    async fn create_conversation(
        &self,
        data: CreateConversation,
        messages: &[ChatMessage],
    ) -> StoreResult<(Conversation, Vec<Message>)> {
        Ok(Conversation::create_with_messages(&self.pool, data, messages).await?)
    }

    async fn append_messages(
        &self,
        conversation_id: Uuid,
        messages: &[ChatMessage],
    ) -> StoreResult<Vec<Message>> {
        Ok(Conversation::append_messages(&self.pool, conversation_id, messages).await?)
    }

    async fn find_owned_conversation(
        &self,
        conversation_id: Uuid,
        owner_user_id: Uuid,
    ) -> StoreResult<Option<Conversation>> {
        Ok(Conversation::find_owned(&self.pool, conversation_id, owner_user_id).await?)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> StoreResult<Vec<Message>> {
        Ok(Message::list_by_conversation(&self.pool, conversation_id).await?)
    }

    async fn list_conversations(&self, owner_user_id: Uuid) -> StoreResult<Vec<Conversation>> {
        Ok(Conversation::list_by_owner(&self.pool, owner_user_id).await?)
    }
}
