//! Outbound mail.
//!
//! Templates and SMTP belong to the mail service; the gateway only hands
//! over the template name and its data.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

/// Mail errors.
#[derive(Debug, Error)]
pub enum MailError {
    /// The transport refused the message.
    #[error("{0}")]
    Transport(String),
}

/// A message for the mail service.
#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Template name, e.g. `activation-mail`.
    pub template: String,
    /// Template data.
    pub data: Value,
}

/// Sends mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Hand a message to the transport.
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

/// Mailer that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            template = %message.template,
            "Mail: {}",
            message.subject
        );
        tracing::debug!(data = %message.data, "Mail data");
        Ok(())
    }
}

/// Mailer keeping every message in memory.
#[derive(Debug, Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl OutboxMailer {
    /// Create an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first.
    pub async fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().await.clone()
    }

    /// Most recent message to an address.
    pub async fn last_to(&self, to: &str) -> Option<MailMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| m.to == to)
            .cloned()
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        self.sent.lock().await.push(message);
        Ok(())
    }
}
