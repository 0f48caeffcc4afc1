use checkout_common::Paise;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The body of a create-order request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGatewayOrder {
    /// In the minor currency unit
    pub amount: Paise,
    pub currency: String,
    /// Our idempotent reference for the order. At most 40 characters.
    pub receipt: String,
    /// Free-form key/value metadata, echoed back on payments
    pub notes: Value,
}

/// An order as the gateway reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayOrderEntity {
    pub id: String,
    pub amount: Paise,
    #[serde(default)]
    pub amount_paid: Paise,
    #[serde(default)]
    pub amount_due: Paise,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub notes: Value,
    #[serde(default)]
    pub created_at: i64,
}

/// A payment as the gateway reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub amount: Paise,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub captured: bool,
    #[serde(default)]
    pub notes: Value,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentCollection {
    pub count: usize,
    pub items: Vec<GatewayPayment>,
}
