/// Database models for parley
///
/// This module contains the persisted records and their SQL operations.
///
/// # Models
///
/// - `user`: Accounts, email verification and password reset state
/// - `conversation`: Conversation metadata owned by one user
/// - `message`: Append-only message log and the model-facing transcript
///
/// Handlers do not call these directly; they go through the store traits in
/// [`crate::store`], whose Postgres implementation delegates here.

pub mod conversation;
pub mod message;
pub mod user;
