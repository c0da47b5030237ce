/// Configuration for the API server
///
/// Loaded from environment variables (and a `.env` file when present).
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default: 0.0.0.0:8000)
/// - `CORS_ORIGINS`: comma-separated origins, `*` for any (default: `*`)
/// - `PRODUCTION`: marks the CSRF cookie `Secure` (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `JWT_SECRET`: signing key for every token, at least 32 characters (required)
/// - `ACCESS_TOKEN_TTL_MINUTES` / `REFRESH_TOKEN_TTL_DAYS`: session lifetimes (60 / 7)
/// - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`: relay; no host means log-only mail
/// - `EMAIL_FROM`: sender address (default: noreply@localhost)
/// - `FRONTEND_URL`: base of the password reset link (default: http://localhost:3000)
/// - `LLM_API_URL`, `LLM_API_KEY`, `LLM_MODEL`: chat-completion endpoint
/// - `LLM_TEMPERATURE`, `LLM_MAX_TOKENS`, `LLM_TITLE_TEMPERATURE`, `LLM_TITLE_MAX_TOKENS`
///
/// # Example
///
/// ```no_run
/// use parley_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::{env, fmt::Display, str::FromStr};

use parley_shared::{db::pool::DatabaseConfig as PoolConfig, llm::LlmConfig, mail::smtp::SmtpSettings};

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,

    pub production: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    /// `None` selects the log-only mailer
    pub smtp: Option<SmtpSettings>,
    pub from: String,
    pub frontend_url: String,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

fn string_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let cors_origins = string_or(&lookup, "CORS_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let smtp = match lookup("SMTP_HOST").filter(|h| !h.is_empty()) {
            Some(host) => Some(SmtpSettings {
                host,
                port: parse_or(&lookup, "SMTP_PORT", 587)?,
                username: lookup("SMTP_USERNAME").filter(|v| !v.is_empty()),
                password: lookup("SMTP_PASSWORD").filter(|v| !v.is_empty()),
            }),
            None => None,
        };

        let llm_defaults = LlmConfig::default();

        Ok(Self {
            api: ApiConfig {
                host: string_or(&lookup, "API_HOST", "0.0.0.0"),
                port: parse_or(&lookup, "API_PORT", 8000)?,
                cors_origins,
                production: parse_or(&lookup, "PRODUCTION", false)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_ttl_minutes: parse_or(&lookup, "ACCESS_TOKEN_TTL_MINUTES", 60)?,
                refresh_ttl_days: parse_or(&lookup, "REFRESH_TOKEN_TTL_DAYS", 7)?,
            },
            mail: MailConfig {
                smtp,
                from: string_or(&lookup, "EMAIL_FROM", "noreply@localhost"),
                frontend_url: string_or(&lookup, "FRONTEND_URL", "http://localhost:3000"),
            },
            llm: LlmConfig {
                api_url: string_or(&lookup, "LLM_API_URL", &llm_defaults.api_url),
                api_key: lookup("LLM_API_KEY").unwrap_or_default(),
                model: string_or(&lookup, "LLM_MODEL", &llm_defaults.model),
                temperature: parse_or(&lookup, "LLM_TEMPERATURE", llm_defaults.temperature)?,
                max_tokens: parse_or(&lookup, "LLM_MAX_TOKENS", llm_defaults.max_tokens)?,
                title_temperature: parse_or(
                    &lookup,
                    "LLM_TITLE_TEMPERATURE",
                    llm_defaults.title_temperature,
                )?,
                title_max_tokens: parse_or(
                    &lookup,
                    "LLM_TITLE_MAX_TOKENS",
                    llm_defaults.title_max_tokens,
                )?,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Pool settings for `parley_shared::db::pool::create_pool`
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            ..PoolConfig::default()
        }
    }

    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.jwt.access_ttl_minutes)
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.jwt.refresh_ttl_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/parley"),
            ("JWT_SECRET", SECRET),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(!config.api.production);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.access_ttl(), chrono::Duration::minutes(60));
        assert_eq!(config.refresh_ttl(), chrono::Duration::days(7));
        assert!(config.mail.smtp.is_none());
        assert_eq!(config.mail.frontend_url, "http://localhost:3000");
        assert_eq!(config.llm.model, "mistral-small-latest");
        assert_eq!(config.llm.title_max_tokens, 20);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/parley"),
            ("JWT_SECRET", SECRET),
            ("API_PORT", "9000"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("PRODUCTION", "true"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USERNAME", "mailer"),
            ("LLM_TEMPERATURE", "0.2"),
        ])
        .unwrap();

        assert_eq!(config.api.port, 9000);
        assert_eq!(
            config.api.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(config.api.production);

        let smtp = config.mail.smtp.unwrap();
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.username.as_deref(), Some("mailer"));
        assert!(smtp.password.is_none());
        assert!((config.llm.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_required_values() {
        assert!(load(&[("JWT_SECRET", SECRET)]).is_err());
        assert!(load(&[("DATABASE_URL", "postgresql://localhost/parley")]).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = load(&[
            ("DATABASE_URL", "postgresql://localhost/parley"),
            ("JWT_SECRET", "short"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("at least 32 characters"));
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = load(&[
            ("DATABASE_URL", "postgresql://localhost/parley"),
            ("JWT_SECRET", SECRET),
            ("API_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("API_PORT"));
    }
}
