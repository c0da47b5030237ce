/// In-memory mailer
///
/// Records every email it is asked to send. Can be switched into a failing
/// mode to exercise transport errors.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{MailError, Mailer, OutgoingEmail};

#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing: AtomicBool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent sends fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Everything delivered so far, oldest first
    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }

    /// The most recent email addressed to `recipient`
    pub async fn last_to(&self, recipient: &str) -> Option<OutgoingEmail> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|email| email.to.iter().any(|to| to.eq_ignore_ascii_case(recipient)))
            .cloned()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Transport("connection refused".to_string()));
        }

        self.sent.lock().await.push(email);
        Ok(())
    }
}
