use async_trait::async_trait;
use thiserror::Error;

use crate::traits::OutboundEmail;

/// Outbound mail. Implementations are shared across the fulfilment tasks, so they must be `Send + Sync`.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError>;
}

#[derive(Debug, Clone, Error)]
pub enum MailerError {
    #[error("Invalid mailbox: {0}")]
    InvalidAddress(String),
    #[error("Could not build the message. {0}")]
    MessageError(String),
    #[error("The mail transport failed. {0}")]
    TransportError(String),
}
