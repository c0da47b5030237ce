/// Outbound mail
///
/// The [`Mailer`] trait is the seam between notification formatting and the
/// transport. Implementations:
///
/// - [`smtp::SmtpMailer`]: `lettre` async SMTP relay
/// - [`log::LogMailer`]: writes mail to the log; used when no relay is configured
/// - [`memory::MemoryMailer`]: keeps sent mail in memory for tests
///
/// [`notifications::NotificationSender`] builds the verification and reset
/// emails on top of any mailer.

pub mod log;
pub mod memory;
pub mod notifications;
pub mod smtp;

use async_trait::async_trait;

/// A plain-text email ready for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
}

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Mail transport failed: {0}")]
    Transport(String),
}

/// Mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}
