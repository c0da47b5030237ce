/// Bearer authentication for Axum
///
/// Reads `Authorization: Bearer <access token>`, validates it with the
/// [`TokenIssuer`], and yields an [`AuthContext`] that the API's middleware
/// layer inserts into request extensions.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use parley_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.user_id)
/// }
/// ```

use axum::http::{header, HeaderMap};
use uuid::Uuid;

use super::issuer::{IssuerError, TokenIssuer};

/// Identity of the authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
}

/// Why a request could not be authenticated
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication credentials were not provided")]
    MissingCredentials,

    #[error("Expected Bearer token")]
    InvalidFormat,

    #[error("Token is invalid or expired")]
    InvalidToken,
}

/// Extracts the raw token from an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

/// Authenticates a request from its headers
pub fn authenticate(headers: &HeaderMap, issuer: &TokenIssuer) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;

    let user_id = issuer.authenticate(token).map_err(|e| {
        match e {
            IssuerError::TokenExpired => tracing::debug!("Rejected expired access token"),
            other => tracing::debug!(error = %other, "Rejected access token"),
        }
        AuthError::InvalidToken
    })?;

    Ok(AuthContext { user_id })
}
