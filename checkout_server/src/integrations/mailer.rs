use async_trait::async_trait;
use checkout_engine::traits::{Mailer, MailerError, OutboundEmail};
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport,
    AsyncTransport,
    Message,
    Tokio1Executor,
};
use log::*;

use crate::config::SmtpConfig;

/// Delivers invoices over SMTP with STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailerError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MailerError::TransportError(e.to_string()))?
            .port(config.port);
        if let Some(username) = &config.username {
            builder = builder.credentials(Credentials::new(username.clone(), config.password.reveal().clone()));
        }
        let transport = builder.build();
        info!("📬️ SMTP transport configured for {}:{}", config.host, config.port);
        Ok(Self { transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError> {
        let to = email.to.clone();
        let message = build_message(email)?;
        self.transport.send(message).await.map_err(|e| MailerError::TransportError(e.to_string()))?;
        debug!("📬️ Email sent to {to}");
        Ok(())
    }
}

pub fn build_message(email: OutboundEmail) -> Result<Message, MailerError> {
    let from = email.from.parse::<Mailbox>().map_err(|e| MailerError::InvalidAddress(format!("{}: {e}", email.from)))?;
    let to = email.to.parse::<Mailbox>().map_err(|e| MailerError::InvalidAddress(format!("{}: {e}", email.to)))?;
    let builder = Message::builder().from(from).to(to).subject(email.subject);
    let message = match email.attachment {
        Some(attachment) => {
            let content_type = ContentType::parse(&attachment.content_type).unwrap_or(ContentType::TEXT_PLAIN);
            let body = MultiPart::mixed()
                .singlepart(SinglePart::plain(email.body))
                .singlepart(Attachment::new(attachment.filename).body(attachment.data, content_type));
            builder.multipart(body)
        },
        None => builder.body(email.body),
    };
    message.map_err(|e| MailerError::MessageError(e.to_string()))
}
