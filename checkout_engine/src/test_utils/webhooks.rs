//! Builders for signed gateway messages.
use serde_json::{json, Value};

use crate::{
    db_types::LedgerId,
    helpers::{calculate_hmac, client_callback_payload},
};

pub const TEST_API_SECRET: &str = "test_api_secret";
pub const TEST_WEBHOOK_SECRET: &str = "test_webhook_secret";

/// A webhook body in the gateway's format. Pass `None` as the ledger id to simulate a gateway that does not echo the
/// notes back.
pub fn webhook_body(
    event: &str,
    payment_id: &str,
    gateway_order_id: &str,
    amount: i64,
    ledger_id: Option<&LedgerId>,
) -> Vec<u8> {
    let notes = match ledger_id {
        Some(id) => json!({ "orderId": id.as_str() }),
        None => Value::Array(vec![]),
    };
    let status = match event {
        "payment.failed" => "failed",
        "payment.authorized" => "authorized",
        _ => "captured",
    };
    let body = json!({
        "entity": "event",
        "event": event,
        "contains": ["payment"],
        "payload": { "payment": { "entity": {
            "id": payment_id,
            "entity": "payment",
            "amount": amount,
            "currency": "INR",
            "status": status,
            "order_id": gateway_order_id,
            "notes": notes,
            "error_description": if status == "failed" { Value::from("Payment declined by bank") } else { Value::Null },
        }}},
    });
    body.to_string().into_bytes()
}

pub fn sign_webhook(body: &[u8]) -> String {
    calculate_hmac(TEST_WEBHOOK_SECRET, body)
}

pub fn sign_client_callback(gateway_order_id: &str, payment_id: &str) -> String {
    calculate_hmac(TEST_API_SECRET, client_callback_payload(gateway_order_id, payment_id).as_bytes())
}
