//! # Storefront checkout server
//! This crate hosts the HTTP front end of the storefront checkout. It is responsible for:
//! * Creating orders: a pending ledger entry first, then the matching order on the payment gateway.
//! * Accepting the signed payment confirmation the storefront forwards from the gateway's payment widget.
//! * Accepting the gateway's signed webhooks.
//!
//! Both payment paths are reconciled by the checkout engine, which guarantees that an order leaves `pending` exactly
//! once, whichever path arrives first.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/checkout/order`: Create an order.
//! * `/checkout/confirm`: Client payment confirmation.
//! * `/webhook/gateway`: Payment gateway webhooks. Optionally restricted to a whitelist of gateway IP addresses.
//! * `/track/{ledger_id}`: Order tracking for customers.
//! * `/api/...`: Back-office routes. These require the `SFC_ADMIN_TOKEN` bearer token.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
