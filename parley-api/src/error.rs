/// Error handling for the API server
///
/// Every handler returns `ApiResult<T>`; an `ApiError` renders as
///
/// ```json
/// { "success": false, "error": "bad_request", "message": "Passwords do not match" }
/// ```
///
/// plus `details` for field validation failures and `requires_verification`
/// / `email` for logins of unverified accounts.
///
/// Expired codes and tokens, already-verified accounts and duplicate emails
/// are all client errors and map to 400.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use parley_shared::{
    auth::{
        issuer::IssuerError, middleware::AuthError, password::PasswordError,
        password::PasswordPolicyViolation,
    },
    llm::LlmError,
    mail::MailError,
    store::StoreError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Login of an unverified account (403)
    VerificationRequired { email: String },

    /// Not found (404)
    NotFound(String),

    /// Conflicting state, e.g. duplicate email or already verified (400)
    Conflict(String),

    /// Expired verification code or token (400)
    Expired(String),

    /// Field validation failures (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Mail or language model failure (500); `detail` is logged, not returned
    Upstream { message: String, detail: String },

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,

    /// Error code (e.g. "bad_request", "not_found")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_verification: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

pub const VERIFICATION_REQUIRED_MESSAGE: &str =
    "Please verify your email address before logging in";

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::VerificationRequired { email } => {
                write!(f, "Verification required: {}", email)
            }
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Expired(msg) => write!(f, "Expired: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Upstream { message, detail } => {
                write!(f, "Upstream failure: {} ({})", message, detail)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Shorthand for a single-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::Conflict(_)
            | ApiError::Expired(_)
            | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::VerificationRequired { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream { .. } | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let mut body = ErrorResponse {
            success: false,
            error: String::new(),
            message: String::new(),
            details: None,
            requires_verification: None,
            email: None,
        };

        let (code, message) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg),
            ApiError::Unauthorized(msg) => ("unauthorized", msg),
            ApiError::VerificationRequired { email } => {
                body.requires_verification = Some(true);
                body.email = Some(email);
                ("verification_required", VERIFICATION_REQUIRED_MESSAGE.to_string())
            }
            ApiError::NotFound(msg) => ("not_found", msg),
            ApiError::Conflict(msg) => ("conflict", msg),
            ApiError::Expired(msg) => ("expired", msg),
            ApiError::ValidationError(errors) => {
                let message = errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Request validation failed".to_string());
                body.details = Some(errors);
                ("validation_error", message)
            }
            ApiError::Upstream { message, detail } => {
                tracing::error!(error = %detail, "Upstream failure: {}", message);
                ("upstream_error", message)
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ("internal_error", "An internal error occurred".to_string())
            }
        };

        body.error = code.to_string();
        body.message = message;

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) if what == "email" => {
                ApiError::Conflict("Email already exists".to_string())
            }
            StoreError::Duplicate(what) => ApiError::Conflict(format!("Duplicate {}", what)),
            StoreError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            StoreError::Database(e) => ApiError::InternalError(format!("Database error: {}", e)),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<PasswordPolicyViolation> for ApiError {
    fn from(violation: PasswordPolicyViolation) -> Self {
        ApiError::invalid_field("password", violation.to_string())
    }
}

impl From<IssuerError> for ApiError {
    fn from(err: IssuerError) -> Self {
        match err {
            IssuerError::InvalidCode | IssuerError::Malformed => {
                ApiError::BadRequest(err.to_string())
            }
            IssuerError::CodeExpired | IssuerError::TokenExpired => {
                ApiError::Expired(err.to_string())
            }
            IssuerError::ResetNotPending => ApiError::NotFound(err.to_string()),
            IssuerError::Signing(msg) => ApiError::InternalError(msg),
            IssuerError::Store(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        ApiError::Upstream {
            message: "Failed to send email".to_string(),
            detail: err.to_string(),
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        ApiError::Upstream {
            message: "Failed to get a response from the language model".to_string(),
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[test]
    fn test_client_errors_are_400() {
        for err in [
            ApiError::Conflict("Email already verified".to_string()),
            ApiError::Expired("Token has expired".to_string()),
            ApiError::invalid_field("password", "too short"),
        ] {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_issuer_error_mapping() {
        assert_eq!(ApiError::from(IssuerError::ResetNotPending).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(IssuerError::TokenExpired).status(), StatusCode::BAD_REQUEST);
        assert!(matches!(
            ApiError::from(IssuerError::Malformed),
            ApiError::BadRequest(ref m) if m == "Invalid token"
        ));
        assert!(matches!(
            ApiError::from(StoreError::Duplicate("email".to_string())),
            ApiError::Conflict(ref m) if m == "Email already exists"
        ));
    }

    #[tokio::test]
    async fn test_verification_required_body() {
        let response = ApiError::VerificationRequired {
            email: "a@b.com".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["requires_verification"], true);
        assert_eq!(json["email"], "a@b.com");
        assert_eq!(json["message"], VERIFICATION_REQUIRED_MESSAGE);
    }

    #[tokio::test]
    async fn test_validation_message_is_first_detail() {
        let json = body_json(
            ApiError::from(PasswordPolicyViolation::MissingDigit).into_response(),
        )
        .await;

        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["message"], "Password must contain at least one number");
        assert_eq!(json["details"][0]["field"], "password");
    }

    #[tokio::test]
    async fn test_upstream_detail_is_not_leaked() {
        let err = ApiError::from(LlmError::Status {
            status: 401,
            body: "invalid api key sk-123".to_string(),
        });
        let json = body_json(err.into_response()).await;

        assert_eq!(json["error"], "upstream_error");
        assert!(!json["message"].as_str().unwrap().contains("sk-123"));
    }
}
