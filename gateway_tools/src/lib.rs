//! A thin client for the payment gateway's REST API: order creation and payment lookups.
mod api;
mod config;
mod data_objects;
mod error;
mod helpers;

pub use api::GatewayApi;
pub use config::GatewayConfig;
pub use data_objects::{GatewayOrderEntity, GatewayPayment, NewGatewayOrder, PaymentCollection};
pub use error::GatewayApiError;
