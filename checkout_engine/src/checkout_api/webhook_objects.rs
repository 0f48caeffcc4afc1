//! The subset of the gateway's webhook format that reconciliation needs.
//!
//! ```json
//! {
//!   "entity": "event",
//!   "event": "payment.captured",
//!   "payload": {
//!     "payment": {
//!       "entity": {
//!         "id": "pay_29QQoUBi66xm2f",
//!         "amount": 79900,
//!         "currency": "INR",
//!         "status": "captured",
//!         "order_id": "order_9A33XWu170gUtm",
//!         "notes": { "orderId": "0c4a3f0e-..." }
//!       }
//!     }
//!   }
//! }
//! ```
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::{LedgerId, OrderStatusType, Paise};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayWebhook {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

impl GatewayWebhook {
    pub fn event_type(&self) -> WebhookEventType {
        WebhookEventType::from(self.event.as_str())
    }

    pub fn payment(&self) -> Option<&PaymentEntity> {
        self.payload.payment.as_ref().map(|p| &p.entity)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<PaymentWrapper>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentWrapper {
    pub entity: PaymentEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    /// Captured amount in the minor currency unit
    pub amount: Paise,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    /// Echo of the notes sent at order creation. The gateway sends `[]` when there are none, so this stays untyped.
    #[serde(default)]
    pub notes: Value,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl PaymentEntity {
    /// The ledger id embedded in the notes, if the gateway echoed it back.
    pub fn ledger_id(&self) -> Option<LedgerId> {
        self.notes
            .get("orderId")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(|s| LedgerId(s.trim().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    PaymentCaptured,
    PaymentAuthorized,
    PaymentFailed,
    Other(String),
}

impl WebhookEventType {
    /// The status the order should move to, if this event decides a payment outcome.
    pub fn target_status(&self) -> Option<OrderStatusType> {
        match self {
            WebhookEventType::PaymentCaptured | WebhookEventType::PaymentAuthorized => Some(OrderStatusType::Paid),
            WebhookEventType::PaymentFailed => Some(OrderStatusType::PaymentFailed),
            WebhookEventType::Other(_) => None,
        }
    }
}

impl From<&str> for WebhookEventType {
    fn from(s: &str) -> Self {
        match s {
            "payment.captured" => WebhookEventType::PaymentCaptured,
            "payment.authorized" => WebhookEventType::PaymentAuthorized,
            "payment.failed" => WebhookEventType::PaymentFailed,
            other => WebhookEventType::Other(other.to_string()),
        }
    }
}

impl Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookEventType::PaymentCaptured => f.write_str("payment.captured"),
            WebhookEventType::PaymentAuthorized => f.write_str("payment.authorized"),
            WebhookEventType::PaymentFailed => f.write_str("payment.failed"),
            WebhookEventType::Other(s) => f.write_str(s),
        }
    }
}
