use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::{CartSnapshot, LedgerId, Order, OrderStatusType, Paise, StatusChange};

/// The storefront's request to start a checkout.
///
/// `amount` is kept as raw JSON so that a non-numeric amount is reported as an invalid amount rather than as a
/// deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub amount: Value,
    pub cart_snapshot: CartSnapshot,
}

/// What the storefront needs to launch the gateway's payment widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    pub ledger_id: LedgerId,
    pub gateway_order_id: String,
    pub gateway_order_payload: Value,
}

/// The signed payment confirmation the gateway hands to the storefront, forwarded to us.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfirmation {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
    /// Accepted but not used. The order keeps the snapshot taken when it was created.
    #[serde(default)]
    pub cart_snapshot: Option<Value>,
}

/// The outcome of a reconciliation request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconciliationResult {
    /// This request moved the order out of `pending`.
    Applied(Order),
    /// A valid request, but the order had already left `pending`. Nothing was changed.
    AlreadyProcessed(Order),
    /// An authentic event that does not concern payment outcomes.
    Ignored(String),
}

impl ReconciliationResult {
    pub fn order(&self) -> Option<&Order> {
        match self {
            ReconciliationResult::Applied(o) | ReconciliationResult::AlreadyProcessed(o) => Some(o),
            ReconciliationResult::Ignored(_) => None,
        }
    }

    pub fn ledger_id(&self) -> Option<&LedgerId> {
        self.order().map(|o| &o.id)
    }
}

/// Everything the back office sees for an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub history: Vec<StatusChange>,
}

/// The customer-facing view of an order, for the order-tracking page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTracking {
    pub ledger_id: LedgerId,
    pub status: OrderStatusType,
    pub shipping_status: Option<String>,
    pub amount: Paise,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub history: Vec<StatusChange>,
}

impl OrderTracking {
    pub fn new(order: Order, history: Vec<StatusChange>) -> Self {
        Self {
            ledger_id: order.id,
            status: order.status,
            shipping_status: order.shipping_status,
            amount: order.amount,
            currency: order.currency,
            created_at: order.created_at,
            history,
        }
    }
}

/// A back-office request to set the free-text shipping progress label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingUpdate {
    pub label: String,
    #[serde(default)]
    pub note: Option<String>,
}
