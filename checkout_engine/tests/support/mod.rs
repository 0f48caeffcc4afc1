#![allow(dead_code)]
use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
    time::Duration,
};

use checkout_common::Secret;
use checkout_engine::{
    db_types::{CartItem, CartSnapshot, Customer, Paise, ShippingAddress},
    events::{EventHandlers, EventHooks},
    test_utils::{prepare_test_env, random_db_path, MockGateway, TEST_API_SECRET, TEST_WEBHOOK_SECRET},
    CheckoutApi,
    OrderLedger,
    OrderQueryApi,
    ReconciliationApi,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

#[derive(Default, Clone)]
pub struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::SeqCst)
    }

    /// Waits (briefly) for the hook to have been called `n` times, then gives stragglers a moment to show up.
    pub async fn settle(&self, n: i32) -> i32 {
        for _ in 0..50 {
            if self.count() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.count()
    }
}

pub struct TestSystem {
    pub db: SqliteDatabase,
    pub gateway: MockGateway,
    pub checkout: CheckoutApi<SqliteDatabase, MockGateway>,
    pub reconciliation: ReconciliationApi<SqliteDatabase, MockGateway>,
    pub queries: OrderQueryApi<SqliteDatabase>,
    pub paid_hook: HookCalled,
    pub flagged_hook: HookCalled,
}

impl TestSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        let gateway = MockGateway::default();
        let paid_hook = HookCalled::default();
        let flagged_hook = HookCalled::default();
        let mut hooks = EventHooks::default();
        let paid = paid_hook.clone();
        hooks.on_order_paid(move |ev| {
            info!("🪝️ Order paid: {}", ev.order.id);
            paid.called();
            Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let flagged = flagged_hook.clone();
        hooks.on_order_flagged(move |ev| {
            info!("🪝️ Order flagged: {} ({} != {})", ev.order.id, ev.captured, ev.expected);
            flagged.called();
            Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let handlers = EventHandlers::new(16, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;
        let checkout = CheckoutApi::new(db.clone(), gateway.clone()).with_gateway_timeout(Duration::from_millis(200));
        let reconciliation = ReconciliationApi::new(
            db.clone(),
            gateway.clone(),
            producers,
            Secret::new(TEST_API_SECRET.to_string()),
            Secret::new(TEST_WEBHOOK_SECRET.to_string()),
        )
        .with_gateway_timeout(Duration::from_millis(200));
        let queries = OrderQueryApi::new(db.clone());
        Self { db, gateway, checkout, reconciliation, queries, paid_hook, flagged_hook }
    }

    pub async fn tear_down(mut self) {
        let url = self.db.url().to_string();
        if let Err(e) = self.db.close().await {
            error!("🚀️ Failed to close database: {e}");
        }
        drop(self);
        if let Err(e) = Sqlite::drop_database(&url).await {
            warn!("🚀️ Could not remove {url}: {e}");
        }
    }
}

pub fn cart(unit_price: i64, quantity: u32) -> CartSnapshot {
    CartSnapshot {
        customer: Customer {
            name: "Meera Iyer".into(),
            email: "meera@example.com".into(),
            phone: Some("+91 98450 00000".into()),
            shipping_address: ShippingAddress {
                line1: "4 Residency Road".into(),
                line2: None,
                city: "Chennai".into(),
                state: "TN".into(),
                postal_code: "600002".into(),
                country: "IN".into(),
            },
        },
        items: vec![CartItem {
            product_id: "saree-112".into(),
            name: "Kanchipuram silk saree".into(),
            variant: Some("Maroon".into()),
            quantity,
            unit_price: Paise::from(unit_price),
        }],
    }
}
