/// Log-only mailer for environments without an SMTP relay

use async_trait::async_trait;

use super::{MailError, Mailer, OutgoingEmail};

/// Writes each email to the log at `info` and reports success
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            from = %email.from,
            to = ?email.to,
            subject = %email.subject,
            body = %email.body,
            "Email not sent (no SMTP relay configured)"
        );
        Ok(())
    }
}
