use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use serde_json::json;

use crate::{
    db_types::Paise,
    traits::{GatewayError, GatewayOrder, GatewayOrderRequest, PaymentAttempt, PaymentGateway},
};

#[derive(Debug, Clone)]
pub enum GatewayBehaviour {
    Succeed,
    Fail(GatewayError),
    /// Never answers within any sensible timeout
    Hang(Duration),
}

/// A scripted, in-memory payment gateway. Gateway order ids are `order_test_1`, `order_test_2`, ...
///
/// Any payment id looked up against an order it created is reported as captured in full, unless a different outcome
/// was scripted with [`MockGateway::set_payment`].
#[derive(Clone)]
pub struct MockGateway {
    behaviour: Arc<Mutex<GatewayBehaviour>>,
    requests: Arc<Mutex<Vec<GatewayOrderRequest>>>,
    orders: Arc<Mutex<HashMap<String, Paise>>>,
    payments: Arc<Mutex<HashMap<String, PaymentAttempt>>>,
    counter: Arc<AtomicU64>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new(GatewayBehaviour::Succeed)
    }
}

impl MockGateway {
    pub fn new(behaviour: GatewayBehaviour) -> Self {
        Self {
            behaviour: Arc::new(Mutex::new(behaviour)),
            requests: Arc::new(Mutex::new(Vec::new())),
            orders: Arc::new(Mutex::new(HashMap::new())),
            payments: Arc::new(Mutex::new(HashMap::new())),
            counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn set_behaviour(&self, behaviour: GatewayBehaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn requests(&self) -> Vec<GatewayOrderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Scripts the gateway's answer for a payment id.
    pub fn set_payment(&self, gateway_order_id: &str, payment_id: &str, amount: Paise, status: &str) {
        let attempt = PaymentAttempt {
            id: payment_id.to_string(),
            gateway_order_id: gateway_order_id.to_string(),
            amount,
            status: status.to_string(),
            payload: json!({
                "id": payment_id,
                "entity": "payment",
                "order_id": gateway_order_id,
                "amount": amount,
                "status": status,
            }),
        };
        self.payments.lock().unwrap().insert(payment_id.to_string(), attempt);
    }

    async fn misbehave(&self) -> Result<(), GatewayError> {
        let behaviour = self.behaviour.lock().unwrap().clone();
        match behaviour {
            GatewayBehaviour::Succeed => Ok(()),
            GatewayBehaviour::Fail(e) => Err(e),
            GatewayBehaviour::Hang(d) => {
                tokio::time::sleep(d).await;
                Err(GatewayError::Unavailable("hung".into()))
            },
        }
    }
}

impl PaymentGateway for MockGateway {
    async fn create_gateway_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        self.misbehave().await?;
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("order_test_{n}");
        self.orders.lock().unwrap().insert(id.clone(), request.amount);
        let payload = json!({
            "id": id,
            "entity": "order",
            "amount": request.amount,
            "currency": request.currency,
            "receipt": request.receipt,
            "status": "created",
            "notes": request.notes,
        });
        Ok(GatewayOrder { id, amount: request.amount, currency: request.currency, status: "created".into(), payload })
    }

    async fn fetch_order_payment(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
    ) -> Result<Option<PaymentAttempt>, GatewayError> {
        self.misbehave().await?;
        let scripted = self.payments.lock().unwrap().get(payment_id).cloned();
        if let Some(attempt) = scripted {
            return Ok(Some(attempt).filter(|a| a.gateway_order_id == gateway_order_id));
        }
        let amount = self.orders.lock().unwrap().get(gateway_order_id).copied();
        Ok(amount.map(|amount| PaymentAttempt {
            id: payment_id.to_string(),
            gateway_order_id: gateway_order_id.to_string(),
            amount,
            status: "captured".into(),
            payload: json!({ "id": payment_id, "entity": "payment", "order_id": gateway_order_id, "amount": amount }),
        }))
    }
}
