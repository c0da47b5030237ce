/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and the password strength policy
/// - [`jwt`]: signed session and reset tokens
/// - [`verification`]: 6-digit email verification codes
/// - [`issuer`]: issuance, redemption and revocation of every credential
/// - [`middleware`]: bearer-token authentication for Axum handlers
///
/// # Example
///
/// ```no_run
/// use parley_shared::auth::password::{hash_password, verify_password};
/// use parley_shared::auth::jwt::{create_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Abcdef1!")?;
/// assert!(verify_password("Abcdef1!", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
/// let token = create_token(&claims, "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod issuer;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod verification;
