use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use checkout_common::Paise;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

/// The gateway limits receipt identifiers to 40 characters.
pub const MAX_RECEIPT_LENGTH: usize = 40;

//--------------------------------------        LedgerId       ---------------------------------------------------------
/// The opaque, immutable identifier of an order in the ledger. It is generated when the order is created and is sent
/// to the payment gateway in the order notes, so that webhooks can always be traced back to the ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct LedgerId(pub String);

impl LedgerId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A receipt identifier for the gateway, derived from this id and guaranteed to fit in [`MAX_RECEIPT_LENGTH`].
    pub fn receipt(&self) -> String {
        let compact = self.0.chars().filter(|c| c.is_ascii_alphanumeric()).take(32).collect::<String>();
        let mut receipt = format!("rcpt_{compact}");
        receipt.truncate(MAX_RECEIPT_LENGTH);
        receipt
    }
}

impl FromStr for LedgerId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for LedgerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for LedgerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order has been recorded and a gateway order requested, but no payment outcome is known yet.
    Pending,
    /// A verified payment for the full order amount was captured.
    Paid,
    /// The gateway reported that the payment failed. Retrying requires a new order.
    PaymentFailed,
    /// The captured amount disagreed with the order amount. Held for manual review.
    PaymentMismatch,
    /// The order has been shipped/handed over.
    Fulfilled,
    /// The order was cancelled before payment.
    Cancelled,
}

impl OrderStatusType {
    /// The order state machine. Anything not listed here is rejected.
    ///
    /// | From \ To        | Paid | PaymentFailed | PaymentMismatch | Fulfilled | Cancelled |
    /// |------------------|------|---------------|-----------------|-----------|-----------|
    /// | Pending          | ✓    | ✓             | ✓               |           | ✓         |
    /// | Paid             |      |               |                 | ✓         |           |
    /// | PaymentMismatch  |      |               |                 |           | ✓         |
    pub fn can_transition_to(&self, to: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!(
            (self, to),
            (Pending, Paid | PaymentFailed | PaymentMismatch | Cancelled) | (Paid, Fulfilled) | (PaymentMismatch, Cancelled)
        )
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, OrderStatusType::Pending)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatusType::Pending => "pending",
            OrderStatusType::Paid => "paid",
            OrderStatusType::PaymentFailed => "payment_failed",
            OrderStatusType::PaymentMismatch => "payment_mismatch",
            OrderStatusType::Fulfilled => "fulfilled",
            OrderStatusType::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "payment_failed" => Ok(Self::PaymentFailed),
            "payment_mismatch" => Ok(Self::PaymentMismatch),
            "fulfilled" => Ok(Self::Fulfilled),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------   TransitionSource    ---------------------------------------------------------
/// Which path caused a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TransitionSource {
    ClientCallback,
    Webhook,
    Admin,
}

impl Display for TransitionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionSource::ClientCallback => f.write_str("client-callback"),
            TransitionSource::Webhook => f.write_str("webhook"),
            TransitionSource::Admin => f.write_str("admin"),
        }
    }
}

//--------------------------------------     Cart snapshot     ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "IN".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub shipping_address: ShippingAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub variant: Option<String>,
    pub quantity: u32,
    /// Price of a single unit, in paise
    pub unit_price: Paise,
}

impl CartItem {
    /// `None` if the line total overflows
    pub fn line_total(&self) -> Option<Paise> {
        self.unit_price.checked_mul(i64::from(self.quantity))
    }
}

/// The customer's cart and shipping target at the moment the order was placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub customer: Customer,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl CartSnapshot {
    /// `None` if any line total, or their sum, overflows
    pub fn items_total(&self) -> Option<Paise> {
        self.items.iter().try_fold(Paise::default(), |total, item| item.line_total().and_then(|t| total.checked_add(t)))
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: LedgerId,
    pub amount: Paise,
    pub currency: String,
    pub receipt: String,
    pub customer: Customer,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(amount: Paise, currency: &str, cart: CartSnapshot) -> Self {
        let id = LedgerId::random();
        let receipt = id.receipt();
        Self {
            id,
            amount,
            currency: currency.to_string(),
            receipt,
            customer: cart.customer,
            items: cart.items,
            created_at: Utc::now(),
        }
    }
}

//--------------------------------------     PaymentRecord     ---------------------------------------------------------
/// Evidence of a payment, as reported by the gateway. Written at most once per order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub gateway_payment_id: String,
    /// The amount the gateway says it captured
    pub amount: Paise,
    /// The raw notification or confirmation that carried the payment
    pub payload: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: LedgerId,
    pub status: OrderStatusType,
    pub amount: Paise,
    pub currency: String,
    pub receipt: String,
    pub gateway_order_id: Option<String>,
    pub payment: Option<PaymentRecord>,
    pub customer: Customer,
    pub items: Vec<CartItem>,
    /// Free-text shipping progress set by the back office. It is independent of `status`.
    pub shipping_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Order {} [{}] {} {} (gateway order: {})",
            self.id,
            self.status,
            self.amount,
            self.currency,
            self.gateway_order_id.as_deref().unwrap_or("none")
        )
    }
}

//--------------------------------------     StatusChange      ---------------------------------------------------------
/// One entry of an order's append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StatusChange {
    #[sqlx(rename = "from_status")]
    pub from: OrderStatusType,
    #[sqlx(rename = "to_status")]
    pub to: OrderStatusType,
    pub source: TransitionSource,
    pub shipping_label: Option<String>,
    pub note: Option<String>,
    #[sqlx(rename = "created_at")]
    pub at: DateTime<Utc>,
}

//--------------------------------------      Transition       ---------------------------------------------------------
/// Everything that travels with a request to move an order from one status to another.
#[derive(Debug, Clone)]
pub struct Evidence {
    pub source: TransitionSource,
    pub payment: Option<PaymentRecord>,
    pub note: Option<String>,
}

impl Evidence {
    pub fn new(source: TransitionSource) -> Self {
        Self { source, payment: None, note: None }
    }

    pub fn with_payment(mut self, payment: PaymentRecord) -> Self {
        self.payment = Some(payment);
        self
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// The result of a compare-and-set status update.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The order was in the expected state and has been moved. Contains the updated order.
    Applied(Order),
    /// The order had already left the expected state. Nothing was changed. Contains the order as currently stored.
    AlreadyProcessed(Order),
}

impl TransitionOutcome {
    pub fn order(&self) -> &Order {
        match self {
            TransitionOutcome::Applied(o) | TransitionOutcome::AlreadyProcessed(o) => o,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            TransitionOutcome::Applied(o) | TransitionOutcome::AlreadyProcessed(o) => o,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}
