/// In-memory store
///
/// Implements both store traits over `RwLock`-guarded maps. Each trait call
/// takes the lock once, so multi-record writes are atomic with respect to
/// other calls on the same store. Used by the API integration tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ConversationStore, StoreError, StoreResult, UserStore};
use crate::models::{
    conversation::{Conversation, CreateConversation},
    message::{ChatMessage, Message},
    user::{CreateUser, User},
};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    conversations: HashMap<Uuid, Conversation>,
    messages: HashMap<Uuid, Vec<Message>>,
    next_message_id: i64,
}

impl Inner {
    fn user_mut(&mut self, id: Uuid) -> StoreResult<&mut User> {
        self.users.get_mut(&id).ok_or(StoreError::NotFound)
    }

    fn push_messages(&mut self, conversation_id: Uuid, messages: &[ChatMessage]) -> Vec<Message> {
        let now = Utc::now();
        let mut stored = Vec::with_capacity(messages.len());

        for message in messages {
            self.next_message_id += 1;
            stored.push(Message {
                id: self.next_message_id,
                conversation_id,
                role: message.role.as_str().to_string(),
                content: message.content.clone(),
                created_at: now,
            });
        }

        self.messages
            .entry(conversation_id)
            .or_default()
            .extend(stored.iter().cloned());

        stored
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a user's reset expiry; lets tests simulate elapsed time
    pub async fn force_reset_expiry(&self, id: Uuid, expiry: DateTime<Utc>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.user_mut(id)?.reset_token_expiry = Some(expiry);
        Ok(())
    }

    /// Overwrites a user's verification code expiry
    pub async fn force_verification_expiry(
        &self,
        id: Uuid,
        expiry: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.user_mut(id)?.verification_code_expiry = Some(expiry);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;

        let taken = inner
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&data.email));
        if taken {
            return Err(StoreError::Duplicate("email".to_string()));
        }

        let user = User::new_unverified(data);
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_reset_token(&self, id: Uuid, token: &str) -> StoreResult<Option<User>> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .get(&id)
            .filter(|u| u.reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn set_verification_code(
        &self,
        id: Uuid,
        code: Option<&str>,
        expiry: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(id)?;
        user.verification_code = code.map(str::to_string);
        user.verification_code_expiry = expiry;
        Ok(())
    }

    async fn mark_email_verified(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(id)?;
        user.email_verified = true;
        user.is_active = true;
        user.verification_code = None;
        user.verification_code_expiry = None;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: Option<&str>,
        expiry: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(id)?;
        user.reset_token = token.map(str::to_string);
        user.reset_token_expiry = expiry;
        Ok(())
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(id)?;
        user.password_hash = password_hash.to_string();
        user.reset_token = None;
        user.reset_token_expiry = None;
        Ok(())
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.user_mut(id)?.last_login = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create_conversation(
        &self,
        data: CreateConversation,
        messages: &[ChatMessage],
    ) -> StoreResult<(Conversation, Vec<Message>)> {
        let mut inner = self.inner.write().await;

        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            owner_user_id: data.owner_user_id,
            title: data.title,
            created_at: now,
            updated_at: now,
        };
        inner
            .conversations
            .insert(conversation.id, conversation.clone());

        let stored = inner.push_messages(conversation.id, messages);
        Ok((conversation, stored))
    }

    async fn append_messages(
        &self,
        conversation_id: Uuid,
        messages: &[ChatMessage],
    ) -> StoreResult<Vec<Message>> {
        let mut inner = self.inner.write().await;

        let conversation = inner
            .conversations
            .get_mut(&conversation_id)
            .ok_or(StoreError::NotFound)?;
        conversation.updated_at = Utc::now();

        Ok(inner.push_messages(conversation_id, messages))
    }

    async fn find_owned_conversation(
        &self,
        conversation_id: Uuid,
        owner_user_id: Uuid,
    ) -> StoreResult<Option<Conversation>> {
        Ok(self
            .inner
            .read()
            .await
            .conversations
            .get(&conversation_id)
            .filter(|c| c.owner_user_id == owner_user_id)
            .cloned())
    }

    async fn list_messages(&self, conversation_id: Uuid) -> StoreResult<Vec<Message>> {
        Ok(self
            .inner
            .read()
            .await
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_conversations(&self, owner_user_id: Uuid) -> StoreResult<Vec<Conversation>> {
        let inner = self.inner.read().await;
        let mut conversations: Vec<Conversation> = inner
            .conversations
            .values()
            .filter(|c| c.owner_user_id == owner_user_id)
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> CreateUser {
        CreateUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_case_insensitively() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@b.com")).await.unwrap();

        let err = store.create_user(new_user("A@B.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref what) if what == "email"));
    }

    #[tokio::test]
    async fn test_reset_token_lookup_requires_exact_token() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@b.com")).await.unwrap();
        let expiry = Utc::now() + chrono::Duration::hours(1);

        store.set_reset_token(user.id, Some("t1"), Some(expiry)).await.unwrap();
        store.set_reset_token(user.id, Some("t2"), Some(expiry)).await.unwrap();

        assert!(store.find_user_by_reset_token(user.id, "t1").await.unwrap().is_none());
        assert!(store.find_user_by_reset_token(user.id, "t2").await.unwrap().is_some());

        store.set_password(user.id, "new-hash").await.unwrap();
        assert!(store.find_user_by_reset_token(user.id, "t2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_bumps_updated_at_and_keeps_order() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();

        let (first, _) = store
            .create_conversation(
                CreateConversation { owner_user_id: owner, title: "one".to_string() },
                &[ChatMessage::user("a"), ChatMessage::assistant("b")],
            )
            .await
            .unwrap();
        let (second, _) = store
            .create_conversation(
                CreateConversation { owner_user_id: owner, title: "two".to_string() },
                &[],
            )
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .append_messages(first.id, &[ChatMessage::user("c"), ChatMessage::assistant("d")])
            .await
            .unwrap();

        let listed = store.list_conversations(owner).await.unwrap();
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);

        let contents: Vec<String> = store
            .list_messages(first.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_find_owned_conversation_hides_other_users() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let (conversation, _) = store
            .create_conversation(
                CreateConversation { owner_user_id: owner, title: "mine".to_string() },
                &[],
            )
            .await
            .unwrap();

        assert!(store
            .find_owned_conversation(conversation.id, owner)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_owned_conversation(conversation.id, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_append_to_missing_conversation_fails() {
        let store = MemoryStore::new();
        let err = store
            .append_messages(Uuid::new_v4(), &[ChatMessage::user("x")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
