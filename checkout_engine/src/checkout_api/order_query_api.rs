use std::fmt::Debug;

use log::*;

use crate::{
    checkout_api::{
        errors::CheckoutError,
        order_objects::{OrderDetail, OrderTracking, ShippingUpdate},
    },
    db_types::{LedgerId, Order, OrderStatusType},
    traits::OrderLedger,
};

/// Read access to the ledger for order tracking and the back office, plus the shipping-progress label, which lives
/// outside the payment state machine.
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi")
    }
}

impl<B> OrderQueryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderQueryApi<B>
where B: OrderLedger
{
    pub async fn order_detail(&self, id: &LedgerId) -> Result<OrderDetail, CheckoutError> {
        let order = self.fetch(id).await?;
        let history = self.db.fetch_status_history(id).await?;
        Ok(OrderDetail { order, history })
    }

    pub async fn tracking(&self, id: &LedgerId) -> Result<OrderTracking, CheckoutError> {
        let order = self.fetch(id).await?;
        let history = self.db.fetch_status_history(id).await?;
        Ok(OrderTracking::new(order, history))
    }

    /// Orders held for manual review because the captured amount did not match.
    pub async fn flagged_orders(&self) -> Result<Vec<Order>, CheckoutError> {
        let orders = self.db.fetch_orders_with_status(OrderStatusType::PaymentMismatch).await?;
        trace!("🗃️ {} orders are awaiting review", orders.len());
        Ok(orders)
    }

    pub async fn update_shipping_status(&self, id: &LedgerId, update: ShippingUpdate) -> Result<Order, CheckoutError> {
        let label = update.label.trim();
        if label.is_empty() {
            return Err(CheckoutError::MalformedPayload("The shipping label cannot be empty".into()));
        }
        let order = self.db.update_shipping_status(id, label, update.note).await?;
        info!("🗃️ Order {id} shipping status is now '{label}'");
        Ok(order)
    }

    async fn fetch(&self, id: &LedgerId) -> Result<Order, CheckoutError> {
        self.db.fetch_order(id).await?.ok_or_else(|| CheckoutError::OrderNotFound(format!("ledger id {id}")))
    }
}
