use std::time::Duration;

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use checkout_common::Secret;
use checkout_engine::{
    db_types::{OrderStatusType, Paise, TransitionOutcome, TransitionSource},
    events::EventProducers,
    order_objects::CreatedOrder,
    test_utils::{sign_client_callback, TEST_API_SECRET, TEST_WEBHOOK_SECRET},
    traits::{GatewayError, GatewayOrder, LedgerError, PaymentAttempt},
    CheckoutApi,
    ReconciliationApi,
};
use serde_json::{json, Value};

use super::{
    helpers::{create_order_body, ledger_id, order, send_request},
    mocks::{MockGateway, MockLedger},
};
use crate::{
    data_objects::ConfirmationResponse,
    routes::{ConfirmPaymentRoute, CreateOrderRoute},
};

fn configure_checkout(cfg: &mut ServiceConfig, ledger: MockLedger, gateway: MockGateway) {
    let api = CheckoutApi::new(ledger, gateway).with_gateway_timeout(Duration::from_secs(1));
    cfg.app_data(web::Data::new(api)).service(CreateOrderRoute::<MockLedger, MockGateway>::new());
}

fn configure_confirmation(cfg: &mut ServiceConfig, ledger: MockLedger, gateway: MockGateway) {
    let api = ReconciliationApi::new(
        ledger,
        gateway,
        EventProducers::default(),
        Secret::new(TEST_API_SECRET.to_string()),
        Secret::new(TEST_WEBHOOK_SECRET.to_string()),
    )
    .with_gateway_timeout(Duration::from_secs(1));
    cfg.app_data(web::Data::new(api)).service(ConfirmPaymentRoute::<MockLedger, MockGateway>::new());
}

fn gateway_reporting(amount: i64, status: &'static str) -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_order_payment().times(1).returning(move |order_id, payment_id| {
        Ok(Some(PaymentAttempt {
            id: payment_id.to_string(),
            gateway_order_id: order_id.to_string(),
            amount: Paise::from(amount),
            status: status.to_string(),
            payload: json!({ "id": payment_id, "amount": amount, "status": status }),
        }))
    });
    gateway
}

fn silent_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_order_payment().never();
    gateway
}

fn confirmation(signature: &str) -> Value {
    json!({
        "gatewayOrderId": "order_Gw1",
        "gatewayPaymentId": "pay_Q1w2e3",
        "signature": signature,
        "cartSnapshot": {}
    })
}

#[actix_web::test]
async fn create_order() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/checkout/order").set_json(create_order_body(json!(50_000)));
    let (status, body) = send_request(req, |cfg| {
        let mut ledger = MockLedger::new();
        ledger.expect_insert_pending_order().times(1).returning(|new_order| {
            let mut o = order(OrderStatusType::Pending);
            o.id = new_order.id;
            o.receipt = new_order.receipt;
            o.amount = new_order.amount;
            o.gateway_order_id = None;
            Ok(o)
        });
        ledger.expect_attach_gateway_order_id().times(1).returning(|id, gateway_order_id| {
            let mut o = order(OrderStatusType::Pending);
            o.id = id.clone();
            o.gateway_order_id = Some(gateway_order_id.to_string());
            Ok(o)
        });
        let mut gateway = MockGateway::new();
        gateway.expect_create_gateway_order().times(1).returning(|request| {
            assert_eq!(request.amount, Paise::from(50_000));
            assert!(request.receipt.len() <= 40);
            Ok(GatewayOrder {
                id: "order_Gw1".to_string(),
                amount: request.amount,
                currency: request.currency,
                status: "created".to_string(),
                payload: json!({ "id": "order_Gw1", "amount": 50_000, "status": "created" }),
            })
        });
        configure_checkout(cfg, ledger, gateway);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let created = serde_json::from_str::<CreatedOrder>(&body).expect("Response should be a created order");
    assert_eq!(created.gateway_order_id, "order_Gw1");
    assert_eq!(created.gateway_order_payload["status"], "created");
}

#[actix_web::test]
async fn create_order_with_invalid_amount() {
    let _ = env_logger::try_init().ok();
    for amount in [json!(0), json!(-500), json!("500"), json!(12.5), Value::Null] {
        let req = TestRequest::post().uri("/checkout/order").set_json(create_order_body(amount.clone()));
        let (status, body) = send_request(req, |cfg| {
            let mut ledger = MockLedger::new();
            ledger.expect_insert_pending_order().never();
            let mut gateway = MockGateway::new();
            gateway.expect_create_gateway_order().never();
            configure_checkout(cfg, ledger, gateway);
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {amount}");
        assert!(body.contains("Invalid amount"), "{body}");
    }
}

#[actix_web::test]
async fn create_order_when_gateway_is_down() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/checkout/order").set_json(create_order_body(json!(50_000)));
    let (status, body) = send_request(req, |cfg| {
        let mut ledger = MockLedger::new();
        ledger.expect_insert_pending_order().times(1).returning(|new_order| {
            let mut o = order(OrderStatusType::Pending);
            o.id = new_order.id;
            o.gateway_order_id = None;
            Ok(o)
        });
        ledger.expect_attach_gateway_order_id().never();
        let mut gateway = MockGateway::new();
        gateway
            .expect_create_gateway_order()
            .times(1)
            .returning(|_| Err(GatewayError::Unavailable("connection refused".to_string())));
        configure_checkout(cfg, ledger, gateway);
    })
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("remains pending"), "{body}");
}

#[actix_web::test]
async fn confirm_payment() {
    let _ = env_logger::try_init().ok();
    let signature = sign_client_callback("order_Gw1", "pay_Q1w2e3");
    let req = TestRequest::post().uri("/checkout/confirm").set_json(confirmation(&signature));
    let (status, body) = send_request(req, |cfg| {
        let mut ledger = MockLedger::new();
        ledger
            .expect_fetch_order_by_gateway_order_id()
            .times(1)
            .returning(|_| Ok(Some(order(OrderStatusType::Pending))));
        ledger
            .expect_try_transition()
            .times(1)
            .withf(|_, from, to, evidence| {
                *from == OrderStatusType::Pending &&
                    *to == OrderStatusType::Paid &&
                    evidence.source == TransitionSource::ClientCallback &&
                    evidence.payment.as_ref().is_some_and(|p| p.gateway_payment_id == "pay_Q1w2e3")
            })
            .returning(|_, _, to, evidence| {
                let mut o = order(to);
                o.payment = evidence.payment;
                Ok(TransitionOutcome::Applied(o))
            });
        configure_confirmation(cfg, ledger, gateway_reporting(50_000, "captured"));
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let response = serde_json::from_str::<ConfirmationResponse>(&body).expect("Response should be a confirmation");
    assert_eq!(response, ConfirmationResponse::ok(ledger_id()));
}

#[actix_web::test]
async fn confirm_payment_already_settled_by_webhook() {
    let _ = env_logger::try_init().ok();
    let signature = sign_client_callback("order_Gw1", "pay_Q1w2e3");
    let req = TestRequest::post().uri("/checkout/confirm").set_json(confirmation(&signature));
    let (status, body) = send_request(req, |cfg| {
        let mut ledger = MockLedger::new();
        ledger.expect_fetch_order_by_gateway_order_id().returning(|_| Ok(Some(order(OrderStatusType::Pending))));
        ledger
            .expect_try_transition()
            .times(1)
            .returning(|_, _, _, _| Ok(TransitionOutcome::AlreadyProcessed(order(OrderStatusType::Paid))));
        configure_confirmation(cfg, ledger, gateway_reporting(50_000, "captured"));
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = serde_json::from_str::<Value>(&body).expect("Response should be JSON");
    assert_eq!(body, json!({ "ok": true, "ledgerId": ledger_id().as_str() }));
}

#[actix_web::test]
async fn confirm_payment_with_bad_signature() {
    let _ = env_logger::try_init().ok();
    // Signed for a different payment
    let signature = sign_client_callback("order_Gw1", "pay_Other");
    let req = TestRequest::post().uri("/checkout/confirm").set_json(confirmation(&signature));
    let (status, _) = send_request(req, |cfg| {
        let mut ledger = MockLedger::new();
        ledger.expect_fetch_order_by_gateway_order_id().never();
        ledger.expect_try_transition().never();
        configure_confirmation(cfg, ledger, silent_gateway());
    })
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn confirm_payment_for_unknown_gateway_order() {
    let _ = env_logger::try_init().ok();
    let signature = sign_client_callback("order_Gw1", "pay_Q1w2e3");
    let req = TestRequest::post().uri("/checkout/confirm").set_json(confirmation(&signature));
    let (status, _) = send_request(req, |cfg| {
        let mut ledger = MockLedger::new();
        ledger.expect_fetch_order_by_gateway_order_id().times(1).returning(|_| Ok(None));
        ledger.expect_try_transition().never();
        configure_confirmation(cfg, ledger, silent_gateway());
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn confirm_payment_when_ledger_fails() {
    let _ = env_logger::try_init().ok();
    let signature = sign_client_callback("order_Gw1", "pay_Q1w2e3");
    let req = TestRequest::post().uri("/checkout/confirm").set_json(confirmation(&signature));
    let (status, _) = send_request(req, |cfg| {
        let mut ledger = MockLedger::new();
        ledger
            .expect_fetch_order_by_gateway_order_id()
            .returning(|_| Err(LedgerError::DatabaseError("database is locked".to_string())));
        configure_confirmation(cfg, ledger, silent_gateway());
    })
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn confirm_payment_missing_fields() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/checkout/confirm").set_json(json!({ "gatewayOrderId": "order_Gw1" }));
    let (status, _) = send_request(req, |cfg| configure_confirmation(cfg, MockLedger::new(), silent_gateway())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn confirm_payment_with_short_capture() {
    let _ = env_logger::try_init().ok();
    let signature = sign_client_callback("order_Gw1", "pay_Q1w2e3");
    let req = TestRequest::post().uri("/checkout/confirm").set_json(confirmation(&signature));
    let (status, body) = send_request(req, |cfg| {
        let mut ledger = MockLedger::new();
        ledger.expect_fetch_order_by_gateway_order_id().returning(|_| Ok(Some(order(OrderStatusType::Pending))));
        ledger
            .expect_try_transition()
            .times(1)
            .withf(|_, from, to, evidence| {
                *from == OrderStatusType::Pending &&
                    *to == OrderStatusType::PaymentMismatch &&
                    evidence.payment.as_ref().is_some_and(|p| p.amount == Paise::from(100))
            })
            .returning(|_, _, to, evidence| {
                let mut o = order(to);
                o.payment = evidence.payment;
                Ok(TransitionOutcome::Applied(o))
            });
        configure_confirmation(cfg, ledger, gateway_reporting(100, "captured"));
    })
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("manual review"), "{body}");
}

#[actix_web::test]
async fn confirm_payment_that_was_not_captured() {
    let _ = env_logger::try_init().ok();
    let signature = sign_client_callback("order_Gw1", "pay_Q1w2e3");
    let req = TestRequest::post().uri("/checkout/confirm").set_json(confirmation(&signature));
    let (status, _) = send_request(req, |cfg| {
        let mut ledger = MockLedger::new();
        ledger.expect_fetch_order_by_gateway_order_id().returning(|_| Ok(Some(order(OrderStatusType::Pending))));
        ledger.expect_try_transition().never();
        configure_confirmation(cfg, ledger, gateway_reporting(50_000, "failed"));
    })
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
