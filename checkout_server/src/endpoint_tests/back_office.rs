use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use checkout_common::Secret;
use checkout_engine::{
    db_types::{OrderStatusType, TransitionOutcome, TransitionSource},
    events::EventProducers,
    test_utils::{TEST_API_SECRET, TEST_WEBHOOK_SECRET},
    OrderQueryApi,
    ReconciliationApi,
};
use serde_json::{json, Value};

use super::{
    helpers::{ledger_id, order, send_request},
    mocks::{MockGateway, MockLedger},
};
use crate::{
    middleware::AdminAuthMiddlewareFactory,
    routes::{
        CancelOrderRoute,
        FlaggedOrdersRoute,
        FulfilOrderRoute,
        OrderByIdRoute,
        TrackOrderRoute,
        UpdateShippingRoute,
    },
};

const ADMIN_TOKEN: &str = "s3cr3t-admin-token";

/// `queries` backs the read routes and the shipping label; `reconciliation` backs the status actions.
fn configure_back_office(cfg: &mut ServiceConfig, queries: MockLedger, reconciliation: MockLedger, token: &str) {
    let query_api = OrderQueryApi::new(queries);
    let reconciliation_api = ReconciliationApi::new(
        reconciliation,
        MockGateway::new(),
        EventProducers::default(),
        Secret::new(TEST_API_SECRET.to_string()),
        Secret::new(TEST_WEBHOOK_SECRET.to_string()),
    );
    let admin_scope = web::scope("/api")
        .wrap(AdminAuthMiddlewareFactory::new(Secret::new(token.to_string())))
        .service(OrderByIdRoute::<MockLedger>::new())
        .service(UpdateShippingRoute::<MockLedger>::new())
        .service(FulfilOrderRoute::<MockLedger, MockGateway>::new())
        .service(CancelOrderRoute::<MockLedger, MockGateway>::new())
        .service(FlaggedOrdersRoute::<MockLedger>::new());
    cfg.app_data(web::Data::new(query_api))
        .app_data(web::Data::new(reconciliation_api))
        .service(TrackOrderRoute::<MockLedger>::new())
        .service(admin_scope);
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

fn order_path(suffix: &str) -> String {
    format!("/api/order/{}{suffix}", ledger_id())
}

#[actix_web::test]
async fn back_office_requires_token() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/api/orders/flagged");
    let (status, _) =
        send_request(req, |cfg| configure_back_office(cfg, MockLedger::new(), MockLedger::new(), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::get().uri("/api/orders/flagged").insert_header(bearer("not-the-token"));
    let (status, _) =
        send_request(req, |cfg| configure_back_office(cfg, MockLedger::new(), MockLedger::new(), ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn back_office_is_closed_without_configured_token() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/api/orders/flagged").insert_header(bearer(""));
    let (status, _) = send_request(req, |cfg| configure_back_office(cfg, MockLedger::new(), MockLedger::new(), "")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn flagged_orders() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/api/orders/flagged").insert_header(bearer(ADMIN_TOKEN));
    let (status, body) = send_request(req, |cfg| {
        let mut queries = MockLedger::new();
        queries
            .expect_fetch_orders_with_status()
            .times(1)
            .withf(|status| *status == OrderStatusType::PaymentMismatch)
            .returning(|_| Ok(vec![order(OrderStatusType::PaymentMismatch)]));
        configure_back_office(cfg, queries, MockLedger::new(), ADMIN_TOKEN);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let orders = serde_json::from_str::<Value>(&body).expect("Response should be JSON");
    assert_eq!(orders.as_array().map(Vec::len), Some(1));
    assert_eq!(orders[0]["status"], "payment_mismatch");
}

#[actix_web::test]
async fn order_detail_includes_history() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri(&order_path("")).insert_header(bearer(ADMIN_TOKEN));
    let (status, body) = send_request(req, |cfg| {
        let mut queries = MockLedger::new();
        queries.expect_fetch_order().times(1).returning(|_| Ok(Some(order(OrderStatusType::Paid))));
        queries.expect_fetch_status_history().times(1).returning(|_| Ok(vec![]));
        configure_back_office(cfg, queries, MockLedger::new(), ADMIN_TOKEN);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let detail = serde_json::from_str::<Value>(&body).expect("Response should be JSON");
    assert_eq!(detail["order"]["status"], "paid");
    assert_eq!(detail["order"]["payment"]["gateway_payment_id"], "pay_Q1w2e3");
    assert_eq!(detail["history"], json!([]));
}

#[actix_web::test]
async fn shipping_update_leaves_status_alone() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::patch()
        .uri(&order_path("/shipping"))
        .insert_header(bearer(ADMIN_TOKEN))
        .set_json(json!({ "label": "Dispatched via BlueDart", "note": "AWB 1234" }));
    let (status, body) = send_request(req, |cfg| {
        let mut queries = MockLedger::new();
        queries.expect_update_shipping_status().times(1).returning(|_, label, note| {
            assert_eq!(note.as_deref(), Some("AWB 1234"));
            let mut o = order(OrderStatusType::Paid);
            o.shipping_status = Some(label.to_string());
            Ok(o)
        });
        queries.expect_try_transition().never();
        configure_back_office(cfg, queries, MockLedger::new(), ADMIN_TOKEN);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated = serde_json::from_str::<Value>(&body).expect("Response should be JSON");
    assert_eq!(updated["status"], "paid");
    assert_eq!(updated["shipping_status"], "Dispatched via BlueDart");
}

#[actix_web::test]
async fn empty_shipping_label_is_rejected() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::patch()
        .uri(&order_path("/shipping"))
        .insert_header(bearer(ADMIN_TOKEN))
        .set_json(json!({ "label": "  " }));
    let (status, _) = send_request(req, |cfg| {
        let mut queries = MockLedger::new();
        queries.expect_update_shipping_status().never();
        configure_back_office(cfg, queries, MockLedger::new(), ADMIN_TOKEN);
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn fulfil_paid_order() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri(&order_path("/fulfil"))
        .insert_header(bearer(ADMIN_TOKEN))
        .set_json(json!({ "note": "Handed to courier" }));
    let (status, body) = send_request(req, |cfg| {
        let mut reconciliation = MockLedger::new();
        reconciliation
            .expect_try_transition()
            .times(1)
            .withf(|_, from, to, evidence| {
                *from == OrderStatusType::Paid &&
                    *to == OrderStatusType::Fulfilled &&
                    evidence.source == TransitionSource::Admin &&
                    evidence.note.as_deref() == Some("Handed to courier")
            })
            .returning(|_, _, to, _| Ok(TransitionOutcome::Applied(order(to))));
        configure_back_office(cfg, MockLedger::new(), reconciliation, ADMIN_TOKEN);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let fulfilled = serde_json::from_str::<Value>(&body).expect("Response should be JSON");
    assert_eq!(fulfilled["status"], "fulfilled");
}

#[actix_web::test]
async fn unpaid_order_cannot_be_fulfilled() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri(&order_path("/fulfil")).insert_header(bearer(ADMIN_TOKEN));
    let (status, _) = send_request(req, |cfg| {
        let mut reconciliation = MockLedger::new();
        reconciliation
            .expect_try_transition()
            .times(1)
            .returning(|_, _, _, _| Ok(TransitionOutcome::AlreadyProcessed(order(OrderStatusType::Pending))));
        configure_back_office(cfg, MockLedger::new(), reconciliation, ADMIN_TOKEN);
    })
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn cancel_pending_order() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri(&order_path("/cancel")).insert_header(bearer(ADMIN_TOKEN));
    let (status, body) = send_request(req, |cfg| {
        let mut reconciliation = MockLedger::new();
        reconciliation.expect_fetch_order().times(1).returning(|_| Ok(Some(order(OrderStatusType::Pending))));
        reconciliation
            .expect_try_transition()
            .times(1)
            .withf(|_, from, to, _| *from == OrderStatusType::Pending && *to == OrderStatusType::Cancelled)
            .returning(|_, _, to, _| Ok(TransitionOutcome::Applied(order(to))));
        configure_back_office(cfg, MockLedger::new(), reconciliation, ADMIN_TOKEN);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"status\":\"cancelled\""), "{body}");
}

#[actix_web::test]
async fn paid_order_cannot_be_cancelled() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri(&order_path("/cancel")).insert_header(bearer(ADMIN_TOKEN));
    let (status, _) = send_request(req, |cfg| {
        let mut reconciliation = MockLedger::new();
        reconciliation.expect_fetch_order().returning(|_| Ok(Some(order(OrderStatusType::Paid))));
        reconciliation.expect_try_transition().never();
        configure_back_office(cfg, MockLedger::new(), reconciliation, ADMIN_TOKEN);
    })
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn tracking_is_public() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri(&format!("/track/{}", ledger_id()));
    let (status, body) = send_request(req, |cfg| {
        let mut queries = MockLedger::new();
        queries.expect_fetch_order().times(1).returning(|_| {
            let mut o = order(OrderStatusType::Paid);
            o.shipping_status = Some("Packed".to_string());
            Ok(Some(o))
        });
        queries.expect_fetch_status_history().times(1).returning(|_| Ok(vec![]));
        configure_back_office(cfg, queries, MockLedger::new(), ADMIN_TOKEN);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let tracking = serde_json::from_str::<Value>(&body).expect("Response should be JSON");
    assert_eq!(tracking["ledgerId"], ledger_id().as_str());
    assert_eq!(tracking["status"], "paid");
    assert_eq!(tracking["shippingStatus"], "Packed");
    assert_eq!(tracking["amount"], 50_000);
}

#[actix_web::test]
async fn tracking_unknown_order() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/track/no-such-order");
    let (status, _) = send_request(req, |cfg| {
        let mut queries = MockLedger::new();
        queries.expect_fetch_order().times(1).returning(|_| Ok(None));
        configure_back_office(cfg, queries, MockLedger::new(), ADMIN_TOKEN);
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
