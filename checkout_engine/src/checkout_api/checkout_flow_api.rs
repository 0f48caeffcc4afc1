use std::{fmt::Debug, time::Duration};

use checkout_common::DEFAULT_CURRENCY_CODE;
use log::*;
use serde_json::Value;

use crate::{
    checkout_api::{errors::CheckoutError, order_objects::CreatedOrder},
    db_types::{CartSnapshot, NewOrder},
    helpers::parse_amount,
    traits::{GatewayOrderRequest, OrderLedger, PaymentGateway},
};

pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// `CheckoutApi` is the Gateway Order Adapter. It records a pending ledger entry and then creates the matching order
/// on the payment gateway.
pub struct CheckoutApi<B, G> {
    db: B,
    gateway: G,
    currency: String,
    gateway_timeout: Duration,
}

impl<B, G> Debug for CheckoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({}, timeout {:?})", self.currency, self.gateway_timeout)
    }
}

impl<B, G> CheckoutApi<B, G> {
    pub fn new(db: B, gateway: G) -> Self {
        Self { db, gateway, currency: DEFAULT_CURRENCY_CODE.to_string(), gateway_timeout: DEFAULT_GATEWAY_TIMEOUT }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> CheckoutApi<B, G>
where
    B: OrderLedger,
    G: PaymentGateway,
{
    /// Starts a checkout.
    ///
    /// 1. The amount is validated. Nothing is persisted for an invalid amount.
    /// 2. The ledger entry is stored as `pending` *before* the gateway is contacted.
    /// 3. The gateway order is created, carrying the ledger id in its notes. The call is bounded by the gateway timeout.
    /// 4. The gateway order id is recorded against the ledger entry.
    ///
    /// If step 3 fails or times out, the ledger entry is left `pending` with no gateway order id, and
    /// [`CheckoutError::GatewayUnavailable`] is returned. The caller may retry, which creates a new entry.
    pub async fn create_order(&self, amount: &Value, cart: CartSnapshot) -> Result<CreatedOrder, CheckoutError> {
        let amount = parse_amount(amount)?;
        let items_total = cart.items_total().ok_or_else(|| {
            warn!("🏦️ Rejecting a cart whose line totals overflow");
            CheckoutError::MalformedPayload("Cart line totals are too large".into())
        })?;
        if !cart.items.is_empty() && items_total != amount {
            warn!("🏦️ Requested amount {amount} differs from the cart total {items_total}. Charging {amount}.");
        }
        let order = self.db.insert_pending_order(NewOrder::new(amount, &self.currency, cart)).await?;
        debug!("🏦️ Order {} is pending. Requesting a gateway order for {amount}", order.id);
        let request = GatewayOrderRequest::for_order(&order);
        let gateway_order = match tokio::time::timeout(self.gateway_timeout, self.gateway.create_gateway_order(request))
            .await
        {
            Ok(Ok(gateway_order)) => gateway_order,
            Ok(Err(e)) => {
                warn!("🏦️ Gateway order creation failed for {}. {e}", order.id);
                return Err(CheckoutError::GatewayUnavailable { ledger_id: order.id, reason: e.to_string() });
            },
            Err(_) => {
                warn!("🏦️ Gateway order creation for {} timed out after {:?}", order.id, self.gateway_timeout);
                let reason = format!("No response within {}ms", self.gateway_timeout.as_millis());
                return Err(CheckoutError::GatewayUnavailable { ledger_id: order.id, reason });
            },
        };
        if gateway_order.amount != order.amount {
            warn!(
                "🏦️ Gateway order {} was created for {} but order {} is for {}",
                gateway_order.id, gateway_order.amount, order.id, order.amount
            );
        }
        let order = self.db.attach_gateway_order_id(&order.id, &gateway_order.id).await?;
        info!("🏦️ Order {} is linked to gateway order {}", order.id, gateway_order.id);
        Ok(CreatedOrder { ledger_id: order.id, gateway_order_id: gateway_order.id, gateway_order_payload: gateway_order.payload })
    }
}
