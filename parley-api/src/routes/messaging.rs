/// Chat relay endpoints
///
/// All routes require a bearer access token; the caller only ever sees
/// conversations it owns. Another user's conversation is reported as not
/// found.
///
/// A chat turn becomes visible only once the model has answered: the user
/// message and the reply are written together, so a failed model call
/// leaves no trace in the history.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use parley_shared::{
    auth::middleware::AuthContext,
    llm,
    models::{
        conversation::{Conversation, CreateConversation},
        message::{ChatMessage, Message},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::present;

const CONVERSATION_NOT_FOUND: &str = "Conversation not found for the user";

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: String,

    /// The assistant's reply
    pub content: String,

    pub conversation_id: Uuid,

    /// When the reply was stored
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageEntry {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Message> for MessageEntry {
    fn from(message: Message) -> Self {
        Self {
            role: message.role,
            content: message.content,
            timestamp: message.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub success: bool,
    pub conversation_id: Uuid,
    pub messages: Vec<MessageEntry>,
}

#[derive(Debug, Serialize)]
pub struct ConversationEntry {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Conversation> for ConversationEntry {
    fn from(conversation: Conversation) -> Self {
        Self {
            id: conversation.id,
            title: conversation.title,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub success: bool,
    pub conversations: Vec<ConversationEntry>,
}

/// Loads a conversation the caller owns; unparseable IDs count as missing
async fn owned_conversation(
    state: &AppState,
    auth: &AuthContext,
    raw_id: &str,
) -> ApiResult<Conversation> {
    let not_found = || ApiError::NotFound(CONVERSATION_NOT_FOUND.to_string());

    let id = Uuid::parse_str(raw_id.trim()).map_err(|_| not_found())?;

    state
        .conversations
        .find_owned_conversation(id, auth.user_id)
        .await?
        .ok_or_else(not_found)
}

/// Sends one user message and returns the model's reply
///
/// ```text
/// POST /messaging/send
/// Authorization: Bearer <access>
/// { "conversation_id": null, "text": "hello" }
/// ```
///
/// Without `conversation_id` a new conversation is started and titled by the
/// model. Returns `201`.
///
/// # Errors
///
/// - `400`: `text` missing or blank
/// - `404`: conversation absent or owned by someone else
/// - `500`: the model call failed; nothing is stored
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<SendMessageResponse>)> {
    let text = present(req.text)
        .ok_or_else(|| ApiError::BadRequest("Text is required".to_string()))?;

    let user_turn = ChatMessage::user(text.clone());

    let (conversation_id, stored) = match present(req.conversation_id) {
        None => {
            let title = llm::clean_title(&state.llm.generate_title(&text).await?);
            let reply = state.llm.complete(std::slice::from_ref(&user_turn)).await?;

            let (conversation, stored) = state
                .conversations
                .create_conversation(
                    CreateConversation {
                        owner_user_id: auth.user_id,
                        title,
                    },
                    &[user_turn, ChatMessage::assistant(reply)],
                )
                .await?;

            tracing::info!(
                user_id = %auth.user_id,
                conversation_id = %conversation.id,
                "Conversation started"
            );
            (conversation.id, stored)
        }
        Some(raw_id) => {
            let conversation = owned_conversation(&state, &auth, &raw_id).await?;

            let history = state.conversations.list_messages(conversation.id).await?;
            let mut transcript = Message::transcript(&history);
            transcript.push(user_turn.clone());

            let reply = state.llm.complete(&transcript).await?;

            let stored = state
                .conversations
                .append_messages(
                    conversation.id,
                    &[user_turn, ChatMessage::assistant(reply)],
                )
                .await?;

            (conversation.id, stored)
        }
    };

    let reply = stored.into_iter().last().ok_or_else(|| {
        ApiError::InternalError("Store returned no messages for a chat turn".to_string())
    })?;

    tracing::debug!(conversation_id = %conversation_id, message_id = reply.id, "Reply stored");

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            success: true,
            message: "Message sent successfully".to_string(),
            content: reply.content,
            conversation_id,
            timestamp: reply.created_at,
        }),
    ))
}

/// Returns a conversation's transcript in order
///
/// ```text
/// GET /messaging/messages?conversation_id=<uuid>
/// ```
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<MessagesQuery>,
) -> ApiResult<Json<MessagesResponse>> {
    let raw_id = present(query.conversation_id)
        .ok_or_else(|| ApiError::BadRequest("Conversation ID is required".to_string()))?;

    let conversation = owned_conversation(&state, &auth, &raw_id).await?;
    let messages = state.conversations.list_messages(conversation.id).await?;

    Ok(Json(MessagesResponse {
        success: true,
        conversation_id: conversation.id,
        messages: messages.into_iter().map(MessageEntry::from).collect(),
    }))
}

/// Lists the caller's conversations, most recently active first
pub async fn get_conversations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ConversationsResponse>> {
    let conversations = state.conversations.list_conversations(auth.user_id).await?;

    Ok(Json(ConversationsResponse {
        success: true,
        conversations: conversations
            .into_iter()
            .map(ConversationEntry::from)
            .collect(),
    }))
}
