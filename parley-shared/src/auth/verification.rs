/// Email verification codes
///
/// A code is a uniformly random 6-digit decimal string stored on the user
/// record with an expiry 30 minutes out.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Lifetime of a verification code
pub const VERIFICATION_CODE_TTL_MINUTES: i64 = 30;

/// Lifetime of a password reset token
pub const RESET_TOKEN_TTL_HOURS: i64 = 1;

pub fn verification_code_ttl() -> Duration {
    Duration::minutes(VERIFICATION_CODE_TTL_MINUTES)
}

pub fn reset_token_ttl() -> Duration {
    Duration::hours(RESET_TOKEN_TTL_HOURS)
}

/// Why a submitted code was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodeCheckError {
    #[error("Invalid verification code")]
    Invalid,

    #[error("Verification code has expired")]
    Expired,
}

/// Generates a 6-digit code in `100000..=999999`
pub fn generate_verification_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Checks a submitted code against the stored one
///
/// A missing or mismatched code is `Invalid`; only a matching code is then
/// checked for expiry. A missing expiry counts as expired.
pub fn check_code(
    stored: Option<&str>,
    expiry: Option<DateTime<Utc>>,
    submitted: &str,
    now: DateTime<Utc>,
) -> Result<(), CodeCheckError> {
    match stored {
        Some(code) if code == submitted => {}
        _ => return Err(CodeCheckError::Invalid),
    }

    match expiry {
        Some(expiry) if now <= expiry => Ok(()),
        _ => Err(CodeCheckError::Expired),
    }
}
