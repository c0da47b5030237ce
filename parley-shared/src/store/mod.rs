/// Persistence interfaces
///
/// Handlers receive stores as trait objects through the application state
/// instead of reaching for a global handle. Two implementations exist:
///
/// - [`postgres::PgStore`]: the production store backed by the `models` queries
/// - [`memory::MemoryStore`]: an in-process store used by tests and local runs
///
/// # Example
///
/// ```
/// use parley_shared::store::{memory::MemoryStore, UserStore};
/// use parley_shared::models::user::CreateUser;
///
/// # async fn example() -> Result<(), parley_shared::store::StoreError> {
/// let store = MemoryStore::new();
/// let user = store.create_user(CreateUser {
///     email: "a@b.com".to_string(),
///     password_hash: "hash".to_string(),
///     first_name: String::new(),
///     last_name: String::new(),
/// }).await?;
/// assert!(store.find_user_by_email("a@b.com").await?.is_some());
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    conversation::{Conversation, CreateConversation},
    message::{ChatMessage, Message},
    user::{CreateUser, User},
};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key already exists
    #[error("Duplicate {0}")]
    Duplicate(String),

    /// The record targeted by a write does not exist
    #[error("Record not found")]
    NotFound,

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                let what = db_err
                    .constraint()
                    .map(|c| if c.contains("email") { "email" } else { c })
                    .unwrap_or("key")
                    .to_string();
                StoreError::Duplicate(what)
            }
            other => StoreError::Database(other),
        }
    }
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Credential store: user records and their verification/reset state
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new inactive, unverified user
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Case-insensitive email lookup
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Finds the user `id` only if `token` is its persisted reset token
    async fn find_user_by_reset_token(&self, id: Uuid, token: &str) -> StoreResult<Option<User>>;

    /// Stores or clears the pending verification code
    async fn set_verification_code(
        &self,
        id: Uuid,
        code: Option<&str>,
        expiry: Option<DateTime<Utc>>,
    ) -> StoreResult<()>;

    /// Sets verified + active and clears the verification code
    async fn mark_email_verified(&self, id: Uuid) -> StoreResult<()>;

    /// Stores or clears the reset token (overwrites any previous one)
    async fn set_reset_token(
        &self,
        id: Uuid,
        token: Option<&str>,
        expiry: Option<DateTime<Utc>>,
    ) -> StoreResult<()>;

    /// Replaces the password hash and clears the reset fields
    async fn set_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;

    async fn record_login(&self, id: Uuid) -> StoreResult<()>;
}

/// Conversation store: metadata plus the append-only message log
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Creates a conversation together with its first messages, atomically
    async fn create_conversation(
        &self,
        data: CreateConversation,
        messages: &[ChatMessage],
    ) -> StoreResult<(Conversation, Vec<Message>)>;

    /// Appends messages and bumps `updated_at`, atomically
    async fn append_messages(
        &self,
        conversation_id: Uuid,
        messages: &[ChatMessage],
    ) -> StoreResult<Vec<Message>>;

    /// Loads a conversation only if `owner_user_id` owns it
    async fn find_owned_conversation(
        &self,
        conversation_id: Uuid,
        owner_user_id: Uuid,
    ) -> StoreResult<Option<Conversation>>;

    /// All messages of a conversation in insertion order
    async fn list_messages(&self, conversation_id: Uuid) -> StoreResult<Vec<Message>>;

    /// A user's conversations, most recently updated first
    async fn list_conversations(&self, owner_user_id: Uuid) -> StoreResult<Vec<Conversation>>;
}
