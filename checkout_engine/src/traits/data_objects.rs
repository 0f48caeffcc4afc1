use serde::{Deserialize, Serialize};

use crate::db_types::{LedgerId, Order, Paise};

/// Opaque metadata attached to a gateway order. The gateway echoes it back on payment entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayNotes {
    #[serde(rename = "orderId")]
    pub order_id: LedgerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrderRequest {
    pub amount: Paise,
    pub currency: String,
    pub receipt: String,
    pub notes: GatewayNotes,
}

impl GatewayOrderRequest {
    /// The gateway request for a ledger entry. The ledger id travels in the notes so that webhooks can always be
    /// traced back to the entry.
    pub fn for_order(order: &Order) -> Self {
        Self {
            amount: order.amount,
            currency: order.currency.clone(),
            receipt: order.receipt.clone(),
            notes: GatewayNotes { order_id: order.id.clone() },
        }
    }
}

/// A gateway order, as returned by the gateway on creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: Paise,
    pub currency: String,
    pub status: String,
    /// The full gateway response, passed back to the storefront to launch the payment widget
    pub payload: serde_json::Value,
}

/// A payment made against a gateway order, as the gateway reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAttempt {
    pub id: String,
    pub gateway_order_id: String,
    pub amount: Paise,
    pub status: String,
    pub payload: serde_json::Value,
}

impl PaymentAttempt {
    /// Authorized payments are captured automatically by the gateway, so both count as money received.
    pub fn is_captured(&self) -> bool {
        matches!(self.status.as_str(), "captured" | "authorized")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<EmailAttachment>,
}
