/// Authentication endpoints
///
/// # Account lifecycle
///
/// ```text
/// signup ──> Unverified ──verify_email──> Active
///                 │  ^                      │  ^
///                 └──┘ resend_code          │  │ reset_password
///                            send_reset_email  │
///                                           v  │
///                                       PendingReset
/// ```
///
/// # Endpoints
///
/// - `GET  /auth/csrf_token`
/// - `POST /auth/login`
/// - `POST /auth/signup`
/// - `POST /auth/verify_email`
/// - `POST /auth/resend_verification_code`
/// - `POST /auth/send_reset_password_email`
/// - `POST /auth/reset_password`
/// - `POST /auth/token/refresh`

use super::{present, validate_request, MessageResponse};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use parley_shared::{
    auth::password,
    models::user::{CreateUser, User, UserSummary},
};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

const CSRF_COOKIE: &str = "csrftoken";
const CSRF_TOKEN_LENGTH: usize = 32;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Successful login or verification
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub message: String,
    pub user: UserSummary,
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub password_confirmation: Option<String>,

    #[serde(default)]
    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: Option<String>,

    #[serde(default)]
    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub verification_code: Option<String>,
}

/// Body of resend-code and request-reset
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
    #[serde(default)]
    pub new_password_confirmation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub access: String,
}

async fn find_user(state: &AppState, email: &str) -> ApiResult<User> {
    state
        .users
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

fn session_response(state: &AppState, user: &User, message: &str) -> ApiResult<SessionResponse> {
    let tokens = state.issuer.issue_session_tokens(user)?;

    Ok(SessionResponse {
        success: true,
        message: message.to_string(),
        user: user.summary(),
        access: tokens.access,
        refresh: tokens.refresh,
    })
}

/// Issues a `csrftoken` cookie for browser clients
///
/// ```json
/// { "detail": "CSRF cookie set" }
/// ```
pub async fn csrf_token(State(state): State<AppState>) -> impl IntoResponse {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CSRF_TOKEN_LENGTH)
        .map(char::from)
        .collect();

    let mut cookie = format!("{}={}; Path=/; SameSite=Lax", CSRF_COOKIE, token);
    if state.config.api.production {
        cookie.push_str("; Secure");
    }

    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "detail": "CSRF cookie set" })),
    )
}

/// Exchanges credentials for a session
///
/// ```text
/// POST /auth/login
/// { "email": "user@example.com", "password": "Abcdef1!" }
/// ```
///
/// # Errors
///
/// - `400`: email or password missing
/// - `401`: unknown email or wrong password (indistinguishable)
/// - `403`: email not verified; body carries `requires_verification` and `email`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let (email, password) = match (present(req.email), present(req.password)) {
        (Some(email), Some(password)) => (email.trim().to_string(), password),
        _ => {
            return Err(ApiError::BadRequest(
                "Email and password are required".to_string(),
            ))
        }
    };

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = state
        .users
        .find_user_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "Login failed: wrong password");
        return Err(invalid());
    }

    if !user.email_verified {
        return Err(ApiError::VerificationRequired { email: user.email });
    }

    let response = session_response(&state, &user, "Login successful")?;
    state.users.record_login(user.id).await?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(response))
}

/// Registers an inactive account and emails a verification code
///
/// ```text
/// POST /auth/signup
/// {
///   "email": "user@example.com",
///   "password": "Abcdef1!",
///   "password_confirmation": "Abcdef1!",
///   "first_name": "Ada",
///   "last_name": "Lovelace"
/// }
/// ```
///
/// Checks run in order: required fields, field format, confirmation match,
/// password strength, email uniqueness. Returns `201` on success.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let (email, password) = match (present(req.email.clone()), present(req.password.clone())) {
        (Some(email), Some(password)) => (email.trim().to_string(), password),
        _ => {
            return Err(ApiError::BadRequest(
                "Email and password are required".to_string(),
            ))
        }
    };

    validate_request(&req)?;

    if req.password_confirmation.as_deref() != Some(password.as_str()) {
        return Err(ApiError::BadRequest("Passwords do not match".to_string()));
    }

    password::validate_password_strength(&password)?;

    if state.users.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    let user = state
        .users
        .create_user(CreateUser {
            email,
            password_hash: password::hash_password(&password)?,
            first_name: req.first_name.unwrap_or_default().trim().to_string(),
            last_name: req.last_name.unwrap_or_default().trim().to_string(),
        })
        .await?;

    tracing::info!(user_id = %user.id, "User signed up");

    let code = state.issuer.issue_email_code(&*state.users, &user).await?;
    state.notifier.send_verification_email(&user, &code).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::ok(
            "User created successfully. Please check your email for verification code.",
        )),
    ))
}

/// Activates an account with its emailed code and starts a session
///
/// # Errors
///
/// - `400`: fields missing, already verified, wrong code, expired code
/// - `404`: no such user
pub async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<VerifyEmailRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let (email, code) = match (present(req.email), present(req.verification_code)) {
        (Some(email), Some(code)) => (email.trim().to_string(), code.trim().to_string()),
        _ => {
            return Err(ApiError::BadRequest(
                "Email and verification code are required".to_string(),
            ))
        }
    };

    let user = find_user(&state, &email).await?;

    if user.email_verified {
        return Err(ApiError::Conflict("Email already verified".to_string()));
    }

    state
        .issuer
        .verify_email_code(&*state.users, &user, &code)
        .await?;

    Ok(Json(session_response(
        &state,
        &user,
        "Email verified successfully",
    )?))
}

/// Replaces the pending code with a fresh one and emails it
pub async fn resend_verification_code(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = present(req.email)
        .ok_or_else(|| ApiError::BadRequest("Email is required".to_string()))?;

    let user = find_user(&state, email.trim()).await?;

    if user.email_verified {
        return Err(ApiError::Conflict("Email already verified".to_string()));
    }

    let code = state.issuer.issue_email_code(&*state.users, &user).await?;
    state.notifier.send_verification_email(&user, &code).await?;

    Ok(Json(MessageResponse::ok(
        "Verification code sent successfully",
    )))
}

/// Starts a password reset; any earlier reset link stops working
pub async fn send_reset_password_email(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = present(req.email)
        .ok_or_else(|| ApiError::BadRequest("Email is required".to_string()))?;

    let user = find_user(&state, email.trim()).await?;

    let token = state.issuer.issue_reset_token(&*state.users, &user).await?;
    state.notifier.send_reset_email(&user, &token).await?;

    tracing::info!(user_id = %user.id, "Password reset requested");
    Ok(Json(MessageResponse::ok("Password reset email sent")))
}

/// Sets a new password using the emailed reset token
///
/// # Errors
///
/// - `400`: fields missing, confirmation mismatch, weak password,
///   malformed token, expired token
/// - `404`: token is not the user's pending reset token (used or superseded)
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (token, new_password, confirmation) = match (
        present(req.token),
        present(req.new_password),
        present(req.new_password_confirmation),
    ) {
        (Some(token), Some(password), Some(confirmation)) => {
            (token.trim().to_string(), password, confirmation)
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Token and new passwords are required".to_string(),
            ))
        }
    };

    if new_password != confirmation {
        return Err(ApiError::BadRequest("Passwords do not match".to_string()));
    }

    password::validate_password_strength(&new_password)?;

    let user = state
        .issuer
        .redeem_reset_token(&*state.users, &token)
        .await?;

    let password_hash = password::hash_password(&new_password)?;
    state.users.set_password(user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Password reset completed");
    Ok(Json(MessageResponse::ok(
        "Password has been reset successfully",
    )))
}

/// Exchanges a refresh token for a new access token
///
/// ```text
/// POST /auth/token/refresh
/// { "refresh": "eyJ..." }
/// ```
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let refresh_token = present(req.refresh)
        .ok_or_else(|| ApiError::BadRequest("Refresh token is required".to_string()))?;

    let access = state
        .issuer
        .refresh_access_token(refresh_token.trim())
        .map_err(|e| {
            tracing::debug!(error = %e, "Refresh rejected");
            ApiError::Unauthorized("Token is invalid or expired".to_string())
        })?;

    Ok(Json(RefreshResponse {
        success: true,
        access,
    }))
}
