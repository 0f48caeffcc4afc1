use actix_web::{
    body::to_bytes,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use checkout_engine::db_types::{
    CartItem,
    Customer,
    LedgerId,
    Order,
    OrderStatusType,
    Paise,
    PaymentRecord,
    ShippingAddress,
};
use chrono::{TimeZone, Utc};
use log::debug;
use serde_json::json;

/// Sends `req` to an app set up by `configure`. Errors raised by middleware are rendered the same way actix renders
/// them for a live server.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = to_bytes(res.into_body()).await.map(|b| String::from_utf8_lossy(&b).into_owned());
            (status, body.unwrap_or_default())
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}

pub fn ledger_id() -> LedgerId {
    LedgerId::from("5b1e0c4e-8c0a-4b7e-9d3f-0a1b2c3d4e5f".to_string())
}

pub fn order(status: OrderStatusType) -> Order {
    let created_at = Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap();
    let payment = (status != OrderStatusType::Pending).then(|| PaymentRecord {
        gateway_payment_id: "pay_Q1w2e3".to_string(),
        amount: Paise::from(50_000),
        payload: json!({}),
        recorded_at: created_at,
    });
    Order {
        id: ledger_id(),
        status,
        amount: Paise::from(50_000),
        currency: "INR".to_string(),
        receipt: ledger_id().receipt(),
        gateway_order_id: Some("order_Gw1".to_string()),
        payment,
        customer: Customer {
            name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: None,
            shipping_address: ShippingAddress {
                line1: "12 MG Road".to_string(),
                line2: None,
                city: "Bengaluru".to_string(),
                state: "KA".to_string(),
                postal_code: "560001".to_string(),
                country: "IN".to_string(),
            },
        },
        items: vec![CartItem {
            product_id: "tee-01".to_string(),
            name: "Cotton tee".to_string(),
            variant: Some("M".to_string()),
            quantity: 2,
            unit_price: Paise::from(25_000),
        }],
        shipping_status: None,
        created_at,
        updated_at: created_at,
    }
}

/// The storefront's create-order body for a cart worth 500.00
pub fn create_order_body(amount: serde_json::Value) -> serde_json::Value {
    json!({
        "amount": amount,
        "cartSnapshot": {
            "customer": {
                "name": "Asha Rao",
                "email": "asha@example.com",
                "shippingAddress": {
                    "line1": "12 MG Road",
                    "city": "Bengaluru",
                    "state": "KA",
                    "postalCode": "560001"
                }
            },
            "items": [
                { "productId": "tee-01", "name": "Cotton tee", "variant": "M", "quantity": 2, "unitPrice": 25000 }
            ]
        }
    })
}
