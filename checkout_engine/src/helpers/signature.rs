//! # Payment signatures
//!
//! The payment gateway authenticates everything it tells us with an HMAC-SHA256 signature, hex-encoded. There are two
//! schemes in use, and they use *different* secrets.
//!
//! ## Client-callback scheme
//!
//! After the customer completes a payment, the gateway's checkout widget hands the storefront a payment id and a
//! signature, which the storefront forwards to us. The signed message is
//!
//! ```text
//!    {gateway_order_id}|{gateway_payment_id}
//! ```
//!
//! encoded as UTF-8 and keyed with the gateway API secret.
//!
//! ## Webhook scheme
//!
//! The gateway POSTs payment events to the webhook route. The signature is carried in a request header and covers the
//! *raw request body bytes*, keyed with the webhook secret. The body must be verified exactly as received; parsing and
//! re-serializing the JSON can change its byte layout and break the signature.
//!
//! All comparisons against the expected MAC are constant-time.

use std::fmt::Display;

use hmac::{Hmac, Mac};
use log::{trace, warn};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    /// HMAC over `{gateway_order_id}|{gateway_payment_id}` with the API secret
    ClientCallback,
    /// HMAC over the raw request body with the webhook secret
    Webhook,
}

impl Display for SignatureScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureScheme::ClientCallback => f.write_str("client-callback"),
            SignatureScheme::Webhook => f.write_str("webhook"),
        }
    }
}

/// The message that is signed in the client-callback scheme.
pub fn client_callback_payload(gateway_order_id: &str, gateway_payment_id: &str) -> String {
    format!("{gateway_order_id}|{gateway_payment_id}")
}

/// Calculates the hex-encoded HMAC-SHA256 of `data` using `secret`.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    let mut mac = mac_for(secret);
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies `signature` (hex) against `payload` and `secret`.
///
/// Returns false for an empty secret, a signature that is not valid hex, or a MAC mismatch. There is no "trust anyway"
/// fallback.
pub fn verify(payload: &[u8], signature: &str, secret: &str, scheme: SignatureScheme) -> bool {
    if secret.is_empty() {
        warn!("🔐️ No secret is configured for {scheme} signatures. Rejecting.");
        return false;
    }
    let expected = match hex::decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("🔐️ {scheme} signature is not valid hex. {e}");
            return false;
        },
    };
    let mut mac = mac_for(secret);
    mac.update(payload);
    // verify_slice is constant-time
    let valid = mac.verify_slice(&expected).is_ok();
    trace!("🔐️ {scheme} signature check: {}", if valid { "✅️" } else { "❌️" });
    valid
}

pub fn verify_client_callback(gateway_order_id: &str, gateway_payment_id: &str, signature: &str, secret: &str) -> bool {
    let payload = client_callback_payload(gateway_order_id, gateway_payment_id);
    verify(payload.as_bytes(), signature, secret, SignatureScheme::ClientCallback)
}

pub fn verify_webhook(raw_body: &[u8], signature: &str, secret: &str) -> bool {
    verify(raw_body, signature, secret, SignatureScheme::Webhook)
}

/// Constant-time equality for secret-derived strings (e.g. API tokens).
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    // Comparing MACs of both values with a fixed key keeps the comparison independent of where the inputs differ and
    // of their lengths.
    let mut mac = mac_for("constant-time-eq");
    mac.update(a.as_bytes());
    let tag = mac.finalize().into_bytes();
    let mut mac = mac_for("constant-time-eq");
    mac.update(b.as_bytes());
    mac.verify_slice(&tag).is_ok()
}

fn mac_for(secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length, so this cannot fail
    <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()).unwrap_or_else(|_| unreachable!("HMAC takes keys of any size"))
}
