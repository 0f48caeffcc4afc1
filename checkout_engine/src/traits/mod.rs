//! # Collaborator contracts
//!
//! This module defines the interfaces the checkout engine relies on. The engine never talks to a concrete database,
//! payment gateway or mail server directly; it is handed implementations of these traits by the process entry point.
//!
//! * [`OrderLedger`] is the persisted record of an order's lifecycle. Backends must evaluate
//!   [`OrderLedger::try_transition`] as a single compare-and-set on the order status.
//! * [`PaymentGateway`] creates remote gateway orders and reports the payments made against them.
//! * [`Mailer`] delivers rendered documents to customers. It is only used by the fulfilment dispatcher.
mod data_objects;
mod mailer;
mod order_ledger;
mod payment_gateway;

pub use data_objects::{
    EmailAttachment,
    GatewayNotes,
    GatewayOrder,
    GatewayOrderRequest,
    OutboundEmail,
    PaymentAttempt,
};
pub use mailer::{Mailer, MailerError};
pub use order_ledger::{LedgerError, OrderLedger};
pub use payment_gateway::{GatewayError, PaymentGateway};
