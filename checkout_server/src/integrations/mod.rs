//! Concrete collaborators for the checkout engine: the hosted payment gateway and outbound mail.
mod gateway;
mod mailer;

pub use gateway::GatewayClient;
pub use mailer::SmtpMailer;
