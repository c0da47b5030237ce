/// Verification and password reset emails
///
/// Pure formatting plus one call to the configured [`Mailer`]. Nothing is
/// retried: a transport failure is returned to the caller.

use std::sync::Arc;

use super::{MailError, Mailer, OutgoingEmail};
use crate::auth::verification::VERIFICATION_CODE_TTL_MINUTES;
use crate::models::user::User;

pub const VERIFICATION_SUBJECT: &str = "Verify Your Email Address";
pub const RESET_SUBJECT: &str = "Password Reset Request";

/// Formats and dispatches account emails
#[derive(Clone)]
pub struct NotificationSender {
    mailer: Arc<dyn Mailer>,
    from: String,
    frontend_url: String,
}

impl NotificationSender {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>, frontend_url: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Link the reset email points at
    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.frontend_url, token)
    }

    pub fn verification_email(&self, user: &User, code: &str) -> OutgoingEmail {
        let name = if user.first_name.is_empty() {
            "User"
        } else {
            user.first_name.as_str()
        };

        let body = format!(
            "Hello {name},\n\n\
             Thank you for signing up! Please verify your email address by entering the verification code below:\n\n\
             Verification Code: {code}\n\n\
             This code will expire in {ttl} minutes.\n\n\
             If you did not create an account, please ignore this email.\n\n\
             Best regards,\n\
             The Support Team",
            ttl = VERIFICATION_CODE_TTL_MINUTES,
        );

        self.email_to(user, VERIFICATION_SUBJECT, body)
    }

    pub fn reset_email(&self, user: &User, token: &str) -> OutgoingEmail {
        let body = format!(
            "Hello {name},\n\n\
             We received a request to reset your password for your account.\n\
             Please click the link below to reset your password. This link will expire in 1 hour:\n\n\
             {link}\n\n\
             If you did not request a password reset, please ignore this email.\n\n\
             Best regards,\n\
             The Support Team",
            name = user.full_name(),
            link = self.reset_link(token),
        );

        self.email_to(user, RESET_SUBJECT, body)
    }

    pub async fn send_verification_email(&self, user: &User, code: &str) -> Result<(), MailError> {
        self.mailer.send(self.verification_email(user, code)).await
    }

    pub async fn send_reset_email(&self, user: &User, token: &str) -> Result<(), MailError> {
        self.mailer.send(self.reset_email(user, token)).await
    }

    fn email_to(&self, user: &User, subject: &str, body: String) -> OutgoingEmail {
        OutgoingEmail {
            subject: subject.to_string(),
            body,
            from: self.from.clone(),
            to: vec![user.email.clone()],
        }
    }
}
