//! # Checkout engine public API
//!
//! The `checkout_api` module exposes the programmatic API of the checkout engine. Like the collaborator traits, the
//! API is split by concern:
//!
//! * [`checkout_flow_api`] is the Gateway Order Adapter: it records a pending order and creates the matching gateway
//!   order.
//! * [`reconciliation_api`] is the order state machine. The client confirmation, the gateway webhook, and the
//!   back-office status actions all go through it.
//! * [`order_query_api`] serves order tracking and the back office.
//!
//! # API usage
//!
//! An API instance is created by supplying a ledger backend and, for checkout and reconciliation, a gateway client:
//!
//! ```rust,ignore
//! use checkout_engine::{events::EventProducers, ReconciliationApi, SqliteDatabase};
//! let db = SqliteDatabase::new(5).await?;
//! let api = ReconciliationApi::new(db, gateway, EventProducers::default(), api_secret, webhook_secret);
//! let result = api.process_webhook(&raw_body, &signature).await?;
//! ```
pub mod checkout_flow_api;
pub mod errors;
pub mod order_objects;
pub mod order_query_api;
pub mod reconciliation_api;
pub mod webhook_objects;
