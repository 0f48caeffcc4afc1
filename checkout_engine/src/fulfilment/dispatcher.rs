use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use thiserror::Error;

use crate::{
    db_types::Order,
    events::{EventHooks, OrderPaidEvent},
    fulfilment::Invoice,
    traits::{Mailer, MailerError, OutboundEmail},
};

#[derive(Debug, Clone, Error)]
pub enum FulfilmentError {
    #[error("Outbound mail is not configured")]
    MailNotConfigured,
    #[error("Order {0} has no customer email address")]
    NoRecipient(String),
    #[error("Could not send the invoice. {0}")]
    MailError(#[from] MailerError),
}

#[derive(Debug, Clone)]
pub struct FulfilmentConfig {
    pub store_name: String,
    pub mail_from: String,
}

impl Default for FulfilmentConfig {
    fn default() -> Self {
        Self { store_name: "Storefront".to_string(), mail_from: "orders@localhost".to_string() }
    }
}

/// Best-effort actions taken after an order is paid: render the invoice and email it to the customer.
///
/// Every failure is logged and swallowed. Nothing here can affect the order status.
#[derive(Clone)]
pub struct FulfilmentDispatcher {
    config: FulfilmentConfig,
    mailer: Option<Arc<dyn Mailer>>,
}

impl FulfilmentDispatcher {
    pub fn new(config: FulfilmentConfig) -> Self {
        Self { config, mailer: None }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub async fn on_paid(&self, order: &Order) {
        let invoice = Invoice::render(order, &self.config.store_name);
        debug!("📬️ Rendered {} ({} bytes) for order {}", invoice.filename, invoice.content.len(), order.id);
        match self.email_invoice(order, &invoice).await {
            Ok(()) => info!("📬️ Invoice for order {} sent to {}", order.id, order.customer.email),
            Err(FulfilmentError::MailNotConfigured) => {
                info!("📬️ Outbound mail is not configured. Invoice for order {} was not emailed.", order.id)
            },
            Err(e) => error!("📬️ Invoice delivery for order {} failed. {e}", order.id),
        }
    }

    pub async fn email_invoice(&self, order: &Order, invoice: &Invoice) -> Result<(), FulfilmentError> {
        let mailer = self.mailer.as_ref().ok_or(FulfilmentError::MailNotConfigured)?;
        let to = order.customer.email.trim();
        if to.is_empty() {
            return Err(FulfilmentError::NoRecipient(order.id.to_string()));
        }
        let email = OutboundEmail {
            from: self.config.mail_from.clone(),
            to: to.to_string(),
            subject: format!("{}: your order {} is confirmed", self.config.store_name, order.id),
            body: format!(
                "Hi {},\n\nThank you for your order. We have received your payment of {} {}.\nYour invoice is \
                 attached.\n\n{}\n",
                order.customer.name, order.amount, order.currency, self.config.store_name
            ),
            attachment: Some(invoice.to_attachment()),
        };
        mailer.send(email).await?;
        Ok(())
    }

    /// Registers the dispatcher as the order-paid hook.
    pub fn register(self, hooks: &mut EventHooks) {
        let dispatcher = Arc::new(self);
        hooks.on_order_paid(move |ev: OrderPaidEvent| {
            let dispatcher = Arc::clone(&dispatcher);
            Box::pin(async move {
                dispatcher.on_paid(&ev.order).await;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
    }
}
