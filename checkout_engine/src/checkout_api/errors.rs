use thiserror::Error;

use crate::{
    db_types::{LedgerId, Order, OrderStatusType, Paise},
    helpers::SignatureScheme,
    traits::LedgerError,
};

/// Everything that can go wrong between an inbound checkout event and the order ledger.
///
/// `AlreadyProcessed` is not a failure from the payer's point of view. It is kept distinct so that callers can log it
/// and still report success.
#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Invalid amount: {0}. Amounts must be positive integers in the minor currency unit")]
    InvalidAmount(String),
    #[error("The payment gateway is unavailable. Order {ledger_id} remains pending. {reason}")]
    GatewayUnavailable { ledger_id: LedgerId, reason: String },
    #[error("The {0} signature is invalid")]
    SignatureInvalid(SignatureScheme),
    #[error("No order could be found for {0}")]
    OrderNotFound(String),
    #[error("Order {} has already been processed. It is {}", .0.id, .0.status)]
    AlreadyProcessed(Box<Order>),
    #[error("Order {ledger_id} expected {expected} but the gateway captured {captured}. Held for manual review")]
    AmountMismatch { ledger_id: LedgerId, expected: Paise, captured: Paise },
    #[error("Payment {payment_id} on order {ledger_id} has not been captured. The gateway reports it as {status}")]
    PaymentNotCaptured { ledger_id: LedgerId, payment_id: String, status: String },
    #[error("Malformed payload. {0}")]
    MalformedPayload(String),
    #[error("Order {ledger_id} cannot move from {from} to {to}")]
    InvalidTransition { ledger_id: LedgerId, from: OrderStatusType, to: OrderStatusType },
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<LedgerError> for CheckoutError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::OrderNotFound(id) => CheckoutError::OrderNotFound(format!("ledger id {id}")),
            e => CheckoutError::DatabaseError(e.to_string()),
        }
    }
}
