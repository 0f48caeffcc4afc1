//! Storefront checkout engine
//!
//! The checkout engine records orders, creates the matching orders on the payment gateway, and reconciles payment
//! outcomes against the order ledger. It is provider-agnostic: the database, gateway and mail server are all
//! collaborators that are handed in by the process entry point.
//!
//! The library is divided into these sections:
//! 1. The order ledger contract ([`traits`]) and the data types stored in it ([`db_types`]). SQLite is the supported
//!    backend ([`SqliteDatabase`]).
//! 2. The public API ([`mod@checkout_api`]): order creation, the reconciliation state machine, and order queries.
//! 3. Payment signature verification ([`helpers`]).
//! 4. Post-payment side effects ([`fulfilment`]), which run off the engine's event hooks ([`events`]).
//!
//! Reconciliation never waits on side effects. When an order becomes paid, an `OrderPaidEvent` is queued and the
//! hook runs in its own task.
pub mod checkout_api;
pub mod db_types;
pub mod events;
pub mod fulfilment;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use checkout_api::{
    checkout_flow_api::CheckoutApi,
    errors::CheckoutError,
    order_objects,
    order_query_api::OrderQueryApi,
    reconciliation_api::ReconciliationApi,
    webhook_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db::db_url, SqliteDatabase};
pub use traits::{LedgerError, OrderLedger, PaymentGateway};
