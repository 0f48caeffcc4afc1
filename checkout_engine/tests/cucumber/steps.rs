use std::time::Duration;

use checkout_engine::{
    db_types::{CartItem, CartSnapshot, Customer, OrderStatusType, Paise},
    order_objects::{ClientConfirmation, ReconciliationResult},
    test_utils::{sign_client_callback, sign_webhook, webhook_body},
    CheckoutError,
    OrderLedger,
};
use cucumber::{given, then, when};
use serde_json::json;

use crate::cucumber::{CheckoutSystem, CheckoutWorld};

fn cart_for(amount: i64) -> CartSnapshot {
    CartSnapshot {
        customer: Customer { name: "Kabir".into(), email: "kabir@example.com".into(), ..Default::default() },
        items: vec![CartItem {
            product_id: "lamp-3".into(),
            name: "Brass lamp".into(),
            variant: None,
            quantity: 1,
            unit_price: Paise::from(amount),
        }],
    }
}

#[given("a fresh checkout system")]
async fn fresh_system(world: &mut CheckoutWorld) {
    world.system = Some(CheckoutSystem::new().await);
}

#[when(expr = "the storefront creates an order {string} for {int} paise")]
async fn create_order(world: &mut CheckoutWorld, name: String, amount: i64) {
    let created =
        world.system().checkout.create_order(&json!(amount), cart_for(amount)).await.expect("Error creating order");
    world.orders.insert(name, created);
}

#[when(expr = "the storefront tries to create an order for {int} paise")]
async fn try_create_order(world: &mut CheckoutWorld, amount: i64) {
    world.last_create_error = world.system().checkout.create_order(&json!(amount), cart_for(amount)).await.err();
}

#[when(expr = "the customer confirms payment {string} for order {string}")]
async fn client_confirmation(world: &mut CheckoutWorld, payment_id: String, name: String) {
    let created = world.order(&name).clone();
    let confirmation = ClientConfirmation {
        signature: sign_client_callback(&created.gateway_order_id, &payment_id),
        gateway_order_id: created.gateway_order_id,
        gateway_payment_id: payment_id,
        cart_snapshot: None,
    };
    world.last_result = Some(world.system().reconciliation.confirm_client_payment(confirmation).await);
}

#[when(expr = "the gateway sends a signed {string} webhook for order {string} with amount {int}")]
async fn signed_webhook(world: &mut CheckoutWorld, event: String, name: String, amount: i64) {
    send_webhook(world, event, name, amount, false).await;
}

#[when(expr = "the gateway sends a tampered {string} webhook for order {string} with amount {int}")]
async fn tampered_webhook(world: &mut CheckoutWorld, event: String, name: String, amount: i64) {
    send_webhook(world, event, name, amount, true).await;
}

async fn send_webhook(world: &mut CheckoutWorld, event: String, name: String, amount: i64, tamper: bool) {
    let created = world.order(&name).clone();
    let payment_id = format!("pay_{name}");
    let mut body = webhook_body(&event, &payment_id, &created.gateway_order_id, amount, Some(&created.ledger_id));
    let signature = sign_webhook(&body);
    if tamper {
        let last = body.len() - 2;
        body[last] ^= 0x20;
    }
    world.last_result = Some(world.system().reconciliation.process_webhook(&body, &signature).await);
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut CheckoutWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[then(expr = "order {string} has status {word}")]
async fn order_status(world: &mut CheckoutWorld, name: String, status: String) {
    let expected = status.parse::<OrderStatusType>().expect("Not a valid order status");
    let id = world.order(&name).ledger_id.clone();
    let order = world.system().db.fetch_order(&id).await.expect("Error fetching order").expect("Order not found");
    assert_eq!(order.status, expected);
}

#[then(expr = "order {string} is linked to a gateway order")]
async fn order_linked(world: &mut CheckoutWorld, name: String) {
    let created = world.order(&name).clone();
    let order = world.system().db.fetch_order(&created.ledger_id).await.unwrap().unwrap();
    assert_eq!(order.gateway_order_id, Some(created.gateway_order_id));
}

#[then(expr = "the last reconciliation result is {string}")]
async fn last_result(world: &mut CheckoutWorld, expected: String) {
    let result = world.last_result.as_ref().expect("No reconciliation has happened");
    let actual = match result {
        Ok(ReconciliationResult::Applied(_)) => "applied",
        Ok(ReconciliationResult::AlreadyProcessed(_)) => "already processed",
        Ok(ReconciliationResult::Ignored(_)) => "ignored",
        Err(e) => panic!("Reconciliation failed: {e}"),
    };
    assert_eq!(actual, expected);
}

#[then(expr = "the last reconciliation error is {string}")]
async fn last_error(world: &mut CheckoutWorld, expected: String) {
    let result = world.last_result.as_ref().expect("No reconciliation has happened");
    let actual = match result {
        Err(CheckoutError::SignatureInvalid(_)) => "signature invalid",
        Err(CheckoutError::AmountMismatch { .. }) => "amount mismatch",
        Err(CheckoutError::OrderNotFound(_)) => "order not found",
        Err(e) => panic!("Unexpected error: {e}"),
        Ok(r) => panic!("Expected an error, but got {r:?}"),
    };
    assert_eq!(actual, expected);
}

#[then(expr = "the order is rejected with {string}")]
async fn create_rejected(world: &mut CheckoutWorld, expected: String) {
    let err = world.last_create_error.as_ref().expect("The order was not rejected");
    let actual = match err {
        CheckoutError::InvalidAmount(_) => "invalid amount",
        CheckoutError::GatewayUnavailable { .. } => "gateway unavailable",
        e => panic!("Unexpected error: {e}"),
    };
    assert_eq!(actual, expected);
}

#[then(expr = "there are {int} pending orders")]
async fn pending_orders(world: &mut CheckoutWorld, count: usize) {
    let orders = world.system().db.fetch_orders_with_status(OrderStatusType::Pending).await.unwrap();
    assert_eq!(orders.len(), count);
}

#[then(expr = "the order paid hook is called {int} time(s)")]
async fn paid_hook_count(world: &mut CheckoutWorld, count: i32) {
    tokio::time::sleep(Duration::from_millis(150)).await;
    let actual = world.system().paid_count.load(std::sync::atomic::Ordering::SeqCst);
    assert_eq!(actual, count);
}
