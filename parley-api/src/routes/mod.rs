/// API route handlers
///
/// - `health`: health check endpoint
/// - `auth`: signup, verification, login, password reset, token refresh
/// - `messaging`: chat relay and conversation history

pub mod auth;
pub mod health;
pub mod messaging;

use crate::error::{ApiError, ApiResult, ValidationErrorDetail};
use serde::Serialize;
use validator::Validate;

/// `{ "success": true, "message": ... }`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// A request field that was sent and is not blank
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Runs `validator` rules and converts failures to `ApiError::ValidationError`
pub(crate) fn validate_request<T: Validate>(req: &T) -> ApiResult<()> {
    req.validate().map_err(|e| {
        let errors: Vec<ValidationErrorDetail> = e
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        ApiError::ValidationError(errors)
    })
}
