/// Token issuer
///
/// Owns every credential the service hands out:
///
/// - email verification codes (persisted on the user, 30 minutes)
/// - password reset tokens (signed JWT, also persisted on the user, 1 hour)
/// - session access/refresh tokens (signed JWT, stateless)
///
/// A reset token is only honoured while it is still the token persisted on
/// the user record, so issuing a new one or completing a reset revokes the
/// previous one even though its signature and `exp` are still valid.
///
/// # Example
///
/// ```no_run
/// use chrono::Duration;
/// use parley_shared::auth::issuer::TokenIssuer;
/// use parley_shared::store::{memory::MemoryStore, UserStore};
/// use parley_shared::models::user::CreateUser;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let issuer = TokenIssuer::new("secret-key-at-least-32-bytes-long!", Duration::minutes(60), Duration::days(7));
///
/// let user = store.create_user(CreateUser {
///     email: "a@b.com".to_string(),
///     password_hash: "hash".to_string(),
///     first_name: String::new(),
///     last_name: String::new(),
/// }).await?;
///
/// let code = issuer.issue_email_code(&store, &user).await?;
/// let user = store.find_user_by_id(user.id).await?.unwrap();
/// issuer.verify_email_code(&store, &user, &code).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::jwt::{self, Claims, JwtError, TokenType};
use super::verification::{self, CodeCheckError};
use crate::models::user::User;
use crate::store::{StoreError, UserStore};

/// Error type for token issuance and redemption
///
/// `Display` is the user-facing message.
#[derive(Debug, thiserror::Error)]
pub enum IssuerError {
    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Verification code has expired")]
    CodeExpired,

    /// Bad signature, structure, issuer or token type
    #[error("Invalid token")]
    Malformed,

    #[error("Token has expired")]
    TokenExpired,

    /// Well-formed reset token that is not the user's pending one
    #[error("Invalid token or user not found")]
    ResetNotPending,

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CodeCheckError> for IssuerError {
    fn from(err: CodeCheckError) -> Self {
        match err {
            CodeCheckError::Invalid => IssuerError::InvalidCode,
            CodeCheckError::Expired => IssuerError::CodeExpired,
        }
    }
}

impl From<JwtError> for IssuerError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => IssuerError::TokenExpired,
            JwtError::CreateError(msg) => IssuerError::Signing(msg),
            JwtError::ValidationError(_) | JwtError::WrongType { .. } => IssuerError::Malformed,
        }
    }
}

/// Access + refresh pair returned on login and verification
#[derive(Debug, Clone, Serialize)]
pub struct SessionTokens {
    pub access: String,
    pub refresh: String,
}

/// Issues and validates every token kind
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Generates a fresh code, persists it with its expiry, and returns it
    ///
    /// Any previously pending code stops working.
    pub async fn issue_email_code(
        &self,
        store: &dyn UserStore,
        user: &User,
    ) -> Result<String, IssuerError> {
        let code = verification::generate_verification_code();
        let expiry = Utc::now() + verification::verification_code_ttl();

        store
            .set_verification_code(user.id, Some(&code), Some(expiry))
            .await?;

        tracing::debug!(user_id = %user.id, expires_at = %expiry, "Issued verification code");
        Ok(code)
    }

    /// Checks `code` against the user's pending code and activates the account
    ///
    /// On success the code is cleared and the user becomes verified and active.
    pub async fn verify_email_code(
        &self,
        store: &dyn UserStore,
        user: &User,
        code: &str,
    ) -> Result<(), IssuerError> {
        verification::check_code(
            user.verification_code.as_deref(),
            user.verification_code_expiry,
            code,
            Utc::now(),
        )?;

        store.mark_email_verified(user.id).await?;

        tracing::info!(user_id = %user.id, "Email verified");
        Ok(())
    }

    /// Mints a reset token and persists it, replacing any earlier one
    pub async fn issue_reset_token(
        &self,
        store: &dyn UserStore,
        user: &User,
    ) -> Result<String, IssuerError> {
        let ttl = verification::reset_token_ttl();
        let claims = Claims::with_expiration(user.id, TokenType::Reset, ttl);
        let token = jwt::create_token(&claims, &self.secret)?;
        let expiry = Utc::now() + ttl;

        store
            .set_reset_token(user.id, Some(&token), Some(expiry))
            .await?;

        tracing::debug!(user_id = %user.id, expires_at = %expiry, "Issued reset token");
        Ok(token)
    }

    /// Checks signature, expiry and type of a reset token; returns the user ID
    ///
    /// This does not consult the store. Use [`Self::redeem_reset_token`] to
    /// also require that the token is still pending.
    pub fn verify_reset_token(&self, token: &str) -> Result<Uuid, IssuerError> {
        let claims = jwt::validate_typed_token(token, &self.secret, TokenType::Reset)?;
        Ok(claims.sub)
    }

    /// Resolves a reset token to the user whose pending reset it is
    ///
    /// # Errors
    ///
    /// - `Malformed` / `TokenExpired` from the signed claims
    /// - `ResetNotPending` if the token was superseded or already used
    /// - `TokenExpired` if the persisted expiry has passed
    pub async fn redeem_reset_token(
        &self,
        store: &dyn UserStore,
        token: &str,
    ) -> Result<User, IssuerError> {
        let user_id = self.verify_reset_token(token)?;

        let user = store
            .find_user_by_reset_token(user_id, token)
            .await?
            .ok_or(IssuerError::ResetNotPending)?;

        if !user.has_pending_reset(token, Utc::now()) {
            return Err(IssuerError::TokenExpired);
        }

        Ok(user)
    }

    /// Issues a stateless access/refresh pair for the user
    pub fn issue_session_tokens(&self, user: &User) -> Result<SessionTokens, IssuerError> {
        let access = Claims::with_expiration(user.id, TokenType::Access, self.access_ttl);
        let refresh = Claims::with_expiration(user.id, TokenType::Refresh, self.refresh_ttl);

        Ok(SessionTokens {
            access: jwt::create_token(&access, &self.secret)?,
            refresh: jwt::create_token(&refresh, &self.secret)?,
        })
    }

    /// Exchanges a refresh token for a new access token
    pub fn refresh_access_token(&self, refresh_token: &str) -> Result<String, IssuerError> {
        let claims = jwt::validate_refresh_token(refresh_token, &self.secret)?;
        let access = Claims::with_expiration(claims.sub, TokenType::Access, self.access_ttl);
        Ok(jwt::create_token(&access, &self.secret)?)
    }

    /// Validates an access token and returns the user ID it identifies
    pub fn authenticate(&self, access_token: &str) -> Result<Uuid, IssuerError> {
        let claims = jwt::validate_access_token(access_token, &self.secret)?;
        Ok(claims.sub)
    }
}
