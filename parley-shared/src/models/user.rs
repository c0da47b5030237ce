/// User model and database operations
///
/// This module provides the User model and the queries behind the credential
/// store: account creation, lookup, email verification state and password
/// reset state.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(254) NOT NULL,  -- unique on LOWER(email)
///     password_hash VARCHAR(255) NOT NULL,
///     first_name VARCHAR(150) NOT NULL DEFAULT '',
///     last_name VARCHAR(150) NOT NULL DEFAULT '',
///     is_active BOOLEAN NOT NULL DEFAULT FALSE,
///     email_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     is_staff BOOLEAN NOT NULL DEFAULT FALSE,
///     is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
///     verification_code VARCHAR(6),
///     verification_code_expiry TIMESTAMPTZ,
///     reset_token TEXT,
///     reset_token_expiry TIMESTAMPTZ,
///     date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login TIMESTAMPTZ
/// );
/// ```
///
/// # Invariants
///
/// - `email_verified = false` implies `is_active = false`
/// - a non-null `verification_code` has a non-null expiry
/// - a non-null `reset_token` has a non-null expiry
///
/// All three are also enforced by CHECK constraints in the migration.
///
/// # Example
///
/// ```no_run
/// use parley_shared::models::user::{User, CreateUser};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
/// }).await?;
///
/// assert!(!user.is_active);
/// let found = User::find_by_email(&pool, "user@example.com").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Column list shared by every query returning a full user row
const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, is_active, \
     email_verified, is_staff, is_superuser, verification_code, verification_code_expiry, \
     reset_token, reset_token_expiry, date_joined, last_login";

/// User account
///
/// Passwords are stored as Argon2id hashes, never in plaintext.
/// Not `Serialize`: use [`UserSummary`] for anything leaving the server.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address, unique and case-insensitive
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    /// False until the email address is verified
    pub is_active: bool,

    pub email_verified: bool,

    pub is_staff: bool,

    pub is_superuser: bool,

    /// Pending 6-digit verification code
    pub verification_code: Option<String>,

    pub verification_code_expiry: Option<DateTime<Utc>>,

    /// Most recently issued password reset token (only this one is redeemable)
    pub reset_token: Option<String>,

    pub reset_token_expiry: Option<DateTime<Utc>>,

    pub date_joined: DateTime<Utc>,

    pub last_login: Option<DateTime<Utc>>,
}

/// Input for creating a new user
///
/// New users always start inactive and unverified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,
}

/// Public projection of a user returned by the auth endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    /// Builds an in-memory user row the way `create` would insert it
    pub fn new_unverified(data: CreateUser) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: data.email,
            password_hash: data.password_hash,
            first_name: data.first_name,
            last_name: data.last_name,
            is_active: false,
            email_verified: false,
            is_staff: false,
            is_superuser: false,
            verification_code: None,
            verification_code_expiry: None,
            reset_token: None,
            reset_token_expiry: None,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }

    /// "First Last", trimmed when either part is empty
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Checks whether `token` is the persisted, still-pending reset token
    pub fn has_pending_reset(&self, token: &str, now: DateTime<Utc>) -> bool {
        match (&self.reset_token, self.reset_token_expiry) {
            (Some(stored), Some(expiry)) => stored == token && expiry >= now,
            _ => false,
        }
    }

    /// Creates a new, inactive and unverified user
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists (unique constraint
    /// violation on `users_email_lower_key`) or the database is unreachable.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, password_hash, first_name, last_name, is_active, email_verified) \
             VALUES ($1, $2, $3, $4, FALSE, FALSE) \
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.first_name)
            .bind(data.last_name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address, ignoring case
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Finds the user whose persisted reset token is exactly `token`
    pub async fn find_by_reset_token(
        pool: &PgPool,
        id: Uuid,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND reset_token = $2");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Stores (or clears, with `None`) the pending verification code
    ///
    /// # Returns
    ///
    /// True if the user was found and updated
    pub async fn set_verification_code(
        pool: &PgPool,
        id: Uuid,
        code: Option<&str>,
        expiry: Option<DateTime<Utc>>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET verification_code = $2, verification_code_expiry = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(expiry)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks the email verified, activates the account and clears the code
    pub async fn mark_email_verified(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verified = TRUE,
                is_active = TRUE,
                verification_code = NULL,
                verification_code_expiry = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores the reset token, overwriting any earlier one
    pub async fn set_reset_token(
        pool: &PgPool,
        id: Uuid,
        token: Option<&str>,
        expiry: Option<DateTime<Utc>>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET reset_token = $2, reset_token_expiry = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expiry)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the password hash and clears any pending reset
    pub async fn set_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, reset_token = NULL, reset_token_expiry = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp, called after successful authentication
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user() -> User {
        User::new_unverified(CreateUser {
            email: "ada@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        })
    }

    #[test]
    fn test_new_user_is_inactive_and_unverified() {
        let user = sample_user();
        assert!(!user.is_active);
        assert!(!user.email_verified);
        assert!(user.verification_code.is_none());
        assert!(user.reset_token.is_none());
    }

    #[test]
    fn test_full_name() {
        let mut user = sample_user();
        assert_eq!(user.full_name(), "Ada Lovelace");

        user.last_name = String::new();
        assert_eq!(user.full_name(), "Ada");
    }

    #[test]
    fn test_summary_omits_secrets() {
        let user = sample_user();
        let json = serde_json::to_value(user.summary()).unwrap();
        assert_eq!(json["email"], "ada@example.com");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_has_pending_reset() {
        let now = Utc::now();
        let mut user = sample_user();
        assert!(!user.has_pending_reset("tok", now));

        user.reset_token = Some("tok".to_string());
        user.reset_token_expiry = Some(now + Duration::hours(1));
        assert!(user.has_pending_reset("tok", now));
        assert!(!user.has_pending_reset("other", now));

        user.reset_token_expiry = Some(now - Duration::seconds(1));
        assert!(!user.has_pending_reset("tok", now));
    }
}
