use std::{fmt::Debug, time::Duration};

use checkout_common::Secret;
use chrono::Utc;
use log::*;
use serde_json::json;

use crate::{
    checkout_api::{
        checkout_flow_api::DEFAULT_GATEWAY_TIMEOUT,
        errors::CheckoutError,
        order_objects::{ClientConfirmation, ReconciliationResult},
        webhook_objects::{GatewayWebhook, PaymentEntity},
    },
    db_types::{Evidence, LedgerId, Order, OrderStatusType, Paise, PaymentRecord, TransitionOutcome, TransitionSource},
    events::{EventProducers, OrderFlaggedEvent, OrderPaidEvent},
    helpers::{verify_client_callback, verify_webhook, SignatureScheme},
    traits::{OrderLedger, PaymentAttempt, PaymentGateway},
};

/// `ReconciliationApi` is the order state machine. Both payment entry points (the client callback and the gateway
/// webhook) and the back-office status actions funnel into [`Self::try_transition`], so whichever path arrives first
/// wins and every later arrival is a harmless no-op.
pub struct ReconciliationApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
    api_secret: Secret<String>,
    webhook_secret: Secret<String>,
    gateway_timeout: Duration,
}

impl<B, G> Debug for ReconciliationApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B, G> ReconciliationApi<B, G> {
    pub fn new(
        db: B,
        gateway: G,
        producers: EventProducers,
        api_secret: Secret<String>,
        webhook_secret: Secret<String>,
    ) -> Self {
        Self { db, gateway, producers, api_secret, webhook_secret, gateway_timeout: DEFAULT_GATEWAY_TIMEOUT }
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> ReconciliationApi<B, G>
where
    B: OrderLedger,
    G: PaymentGateway,
{
    /// The client-callback path.
    ///
    /// The signature only proves that the gateway issued this payment id for the gateway order. The amount actually
    /// captured is read back from the gateway before anything is committed.
    pub async fn confirm_client_payment(
        &self,
        confirmation: ClientConfirmation,
    ) -> Result<ReconciliationResult, CheckoutError> {
        let ClientConfirmation { gateway_order_id, gateway_payment_id, signature, .. } = confirmation;
        if gateway_order_id.trim().is_empty() || gateway_payment_id.trim().is_empty() {
            return Err(CheckoutError::MalformedPayload("Gateway order id and payment id are required".into()));
        }
        if !verify_client_callback(&gateway_order_id, &gateway_payment_id, &signature, self.api_secret.reveal()) {
            warn!("🔐️ Rejected client confirmation for gateway order {gateway_order_id} (payment {gateway_payment_id})");
            return Err(CheckoutError::SignatureInvalid(SignatureScheme::ClientCallback));
        }
        let order = self.db.fetch_order_by_gateway_order_id(&gateway_order_id).await?.ok_or_else(|| {
            error!("🔄️ Authentic confirmation for gateway order {gateway_order_id}, but no order references it");
            CheckoutError::OrderNotFound(format!("gateway order {gateway_order_id}"))
        })?;
        let attempt = self.fetch_payment_attempt(&order, &gateway_order_id, &gateway_payment_id).await?;
        if !attempt.is_captured() {
            warn!(
                "🔄️ Client confirmed payment {gateway_payment_id} for order {}, but the gateway reports it as {}",
                order.id, attempt.status
            );
            return Err(CheckoutError::PaymentNotCaptured {
                ledger_id: order.id,
                payment_id: gateway_payment_id,
                status: attempt.status,
            });
        }
        let payment = PaymentRecord {
            gateway_payment_id: gateway_payment_id.clone(),
            amount: attempt.amount,
            payload: json!({
                "gatewayOrderId": gateway_order_id,
                "gatewayPaymentId": gateway_payment_id,
                "signature": signature,
                "gatewayPayment": attempt.payload,
            }),
            recorded_at: Utc::now(),
        };
        let evidence = Evidence::new(TransitionSource::ClientCallback).with_payment(payment);
        self.settle_payment(&order, attempt.amount, evidence).await
    }

    /// Asks the gateway what it knows about a payment, bounded by the gateway timeout.
    async fn fetch_payment_attempt(
        &self,
        order: &Order,
        gateway_order_id: &str,
        payment_id: &str,
    ) -> Result<PaymentAttempt, CheckoutError> {
        let unavailable = |reason: String| {
            warn!("🏦️ Could not fetch payment {payment_id} for order {}. {reason}", order.id);
            CheckoutError::GatewayUnavailable { ledger_id: order.id.clone(), reason }
        };
        let lookup = self.gateway.fetch_order_payment(gateway_order_id, payment_id);
        match tokio::time::timeout(self.gateway_timeout, lookup).await {
            Ok(Ok(Some(attempt))) => Ok(attempt),
            Ok(Ok(None)) => {
                error!("🔄️ Gateway order {gateway_order_id} has no payment {payment_id}, yet the confirmation is signed");
                Err(CheckoutError::PaymentNotCaptured {
                    ledger_id: order.id.clone(),
                    payment_id: payment_id.to_string(),
                    status: "unknown".to_string(),
                })
            },
            Ok(Err(e)) => Err(unavailable(e.to_string())),
            Err(_) => Err(unavailable(format!("No response within {}ms", self.gateway_timeout.as_millis()))),
        }
    }

    /// The webhook path. `raw_body` must be the request body exactly as received.
    pub async fn process_webhook(
        &self,
        raw_body: &[u8],
        signature: &str,
    ) -> Result<ReconciliationResult, CheckoutError> {
        if !verify_webhook(raw_body, signature, self.webhook_secret.reveal()) {
            warn!("🔐️ Rejected webhook with an invalid signature ({} bytes)", raw_body.len());
            return Err(CheckoutError::SignatureInvalid(SignatureScheme::Webhook));
        }
        let webhook = serde_json::from_slice::<GatewayWebhook>(raw_body).map_err(|e| {
            error!("🔄️ Authentic webhook could not be parsed. {e}");
            CheckoutError::MalformedPayload(e.to_string())
        })?;
        let event = webhook.event_type();
        let Some(target) = event.target_status() else {
            debug!("🔄️ Ignoring webhook event {event}");
            return Ok(ReconciliationResult::Ignored(event.to_string()));
        };
        let payment = webhook.payment().ok_or_else(|| {
            error!("🔄️ Authentic {event} webhook has no payment entity");
            CheckoutError::MalformedPayload(format!("{event} event without a payment entity"))
        })?;
        let order = self.resolve_order(payment).await?;
        debug!("🔄️ {event} webhook for payment {} resolved to order {}", payment.id, order.id);
        let raw = serde_json::from_slice(raw_body).unwrap_or_default();
        match target {
            OrderStatusType::Paid => {
                let record = PaymentRecord {
                    gateway_payment_id: payment.id.clone(),
                    amount: payment.amount,
                    payload: raw,
                    recorded_at: Utc::now(),
                };
                let evidence = Evidence::new(TransitionSource::Webhook).with_payment(record);
                self.settle_payment(&order, payment.amount, evidence).await
            },
            _ => {
                let reason = payment.error_description.clone().unwrap_or_else(|| "no reason given".to_string());
                let evidence =
                    Evidence::new(TransitionSource::Webhook).with_note(format!("Payment {} failed: {reason}", payment.id));
                match self.try_transition(&order.id, OrderStatusType::Pending, target, evidence).await {
                    Ok(order) => Ok(ReconciliationResult::Applied(order)),
                    Err(CheckoutError::AlreadyProcessed(order)) => Ok(ReconciliationResult::AlreadyProcessed(*order)),
                    Err(e) => Err(e),
                }
            },
        }
    }

    /// Moves a `paid` order to `fulfilled`. Repeating the request for a fulfilled order is not an error.
    pub async fn fulfil_order(&self, id: &LedgerId, note: Option<String>) -> Result<Order, CheckoutError> {
        let mut evidence = Evidence::new(TransitionSource::Admin);
        evidence.note = note;
        match self.try_transition(id, OrderStatusType::Paid, OrderStatusType::Fulfilled, evidence).await {
            Err(CheckoutError::AlreadyProcessed(order)) if order.status == OrderStatusType::Fulfilled => Ok(*order),
            Err(CheckoutError::AlreadyProcessed(order)) => Err(CheckoutError::InvalidTransition {
                ledger_id: order.id,
                from: order.status,
                to: OrderStatusType::Fulfilled,
            }),
            result => result,
        }
    }

    /// Cancels an order that was never paid: either still `pending` or parked as `payment_mismatch`.
    pub async fn cancel_order(&self, id: &LedgerId, note: Option<String>) -> Result<Order, CheckoutError> {
        let order = self.db.fetch_order(id).await?.ok_or_else(|| CheckoutError::OrderNotFound(format!("ledger id {id}")))?;
        if order.status == OrderStatusType::Cancelled {
            return Ok(order);
        }
        let mut evidence = Evidence::new(TransitionSource::Admin);
        evidence.note = note;
        // The transition is still keyed on the status we just read, so a concurrent payment wins cleanly.
        match self.try_transition(id, order.status, OrderStatusType::Cancelled, evidence).await {
            Err(CheckoutError::AlreadyProcessed(order)) => Err(CheckoutError::InvalidTransition {
                ledger_id: order.id,
                from: order.status,
                to: OrderStatusType::Cancelled,
            }),
            result => result,
        }
    }

    /// The single transition primitive.
    ///
    /// Rejects transitions the state machine does not allow, then asks the ledger for a compare-and-set keyed on
    /// `from`. A successful move into `paid` publishes an [`OrderPaidEvent`]; a move into `payment_mismatch` publishes
    /// an [`OrderFlaggedEvent`]. If the order was no longer in `from`, [`CheckoutError::AlreadyProcessed`] is returned
    /// and nothing is published.
    pub async fn try_transition(
        &self,
        id: &LedgerId,
        from: OrderStatusType,
        to: OrderStatusType,
        evidence: Evidence,
    ) -> Result<Order, CheckoutError> {
        if !from.can_transition_to(to) {
            return Err(CheckoutError::InvalidTransition { ledger_id: id.clone(), from, to });
        }
        let source = evidence.source;
        match self.db.try_transition(id, from, to, evidence).await? {
            TransitionOutcome::Applied(order) => {
                info!("🔄️ Order {id} moved from {from} to {to} via {source}");
                match to {
                    OrderStatusType::Paid => {
                        self.producers.publish_order_paid(OrderPaidEvent::new(order.clone()));
                    },
                    OrderStatusType::PaymentMismatch => {
                        let captured = order.payment.as_ref().map(|p| p.amount).unwrap_or_default();
                        self.producers.publish_order_flagged(OrderFlaggedEvent::new(order.clone(), captured));
                    },
                    _ => {},
                }
                Ok(order)
            },
            TransitionOutcome::AlreadyProcessed(order) => {
                info!("🔄️ Order {id} is already {}. The {source} request for {to} was a no-op", order.status);
                Err(CheckoutError::AlreadyProcessed(Box::new(order)))
            },
        }
    }

    /// Applies a captured payment to `order`: `paid` if the captured amount matches, `payment_mismatch` otherwise.
    async fn settle_payment(
        &self,
        order: &Order,
        captured: Paise,
        evidence: Evidence,
    ) -> Result<ReconciliationResult, CheckoutError> {
        let source = evidence.source;
        let payment_id = evidence.payment.as_ref().map(|p| p.gateway_payment_id.clone()).unwrap_or_default();
        if captured != order.amount {
            error!(
                "🔄️ Amount mismatch on order {}. Expected {} but {source} reports {captured} captured for payment \
                 {payment_id}. Holding for manual review.",
                order.id, order.amount
            );
            let evidence = evidence.with_note(format!("Expected {} but {captured} was captured", order.amount));
            return match self.try_transition(&order.id, OrderStatusType::Pending, OrderStatusType::PaymentMismatch, evidence).await {
                Ok(_) => Err(CheckoutError::AmountMismatch { ledger_id: order.id.clone(), expected: order.amount, captured }),
                Err(CheckoutError::AlreadyProcessed(current)) => {
                    self.log_late_capture(&current, &payment_id, source);
                    Ok(ReconciliationResult::AlreadyProcessed(*current))
                },
                Err(e) => Err(e),
            };
        }
        match self.try_transition(&order.id, OrderStatusType::Pending, OrderStatusType::Paid, evidence).await {
            Ok(order) => Ok(ReconciliationResult::Applied(order)),
            Err(CheckoutError::AlreadyProcessed(current)) => {
                self.log_late_capture(&current, &payment_id, source);
                Ok(ReconciliationResult::AlreadyProcessed(*current))
            },
            Err(e) => Err(e),
        }
    }

    fn log_late_capture(&self, order: &Order, payment_id: &str, source: TransitionSource) {
        match (order.status, order.payment.as_ref()) {
            (OrderStatusType::PaymentFailed | OrderStatusType::Cancelled, _) => error!(
                "🔄️ Payment {payment_id} was captured ({source}) for order {}, which is {}. Manual follow-up needed.",
                order.id, order.status
            ),
            (_, Some(p)) if p.gateway_payment_id != payment_id => warn!(
                "🔄️ Order {} was settled by payment {} but {source} reports payment {payment_id}",
                order.id, p.gateway_payment_id
            ),
            _ => {},
        }
    }

    /// Finds the ledger entry a payment belongs to: by the ledger id in the notes first, then by the gateway order id.
    async fn resolve_order(&self, payment: &PaymentEntity) -> Result<Order, CheckoutError> {
        if let Some(id) = payment.ledger_id() {
            match self.db.fetch_order(&id).await? {
                Some(order) if linked_consistently(&order, payment) => return self.heal_link(order, payment).await,
                Some(order) => warn!(
                    "🔄️ Payment {} names order {id} in its notes, but that order belongs to gateway order {}",
                    payment.id,
                    order.gateway_order_id.as_deref().unwrap_or("none")
                ),
                None => warn!("🔄️ Payment {} names order {id} in its notes, but there is no such order", payment.id),
            }
        }
        if let Some(gateway_order_id) = payment.order_id.as_deref() {
            if let Some(order) = self.db.fetch_order_by_gateway_order_id(gateway_order_id).await? {
                return Ok(order);
            }
        }
        error!(
            "🔄️ Authentic webhook for payment {} (gateway order {}) does not match any order",
            payment.id,
            payment.order_id.as_deref().unwrap_or("none")
        );
        Err(CheckoutError::OrderNotFound(format!("payment {}", payment.id)))
    }

    /// Records the gateway order id on an entry whose creation was interrupted before the link was stored.
    async fn heal_link(&self, order: Order, payment: &PaymentEntity) -> Result<Order, CheckoutError> {
        match (&order.gateway_order_id, payment.order_id.as_deref()) {
            (None, Some(gateway_order_id)) => match self.db.attach_gateway_order_id(&order.id, gateway_order_id).await {
                Ok(order) => {
                    info!("🔄️ Order {} was missing its gateway order id. Linked to {gateway_order_id}", order.id);
                    Ok(order)
                },
                Err(e) => {
                    warn!("🔄️ Could not link order {} to gateway order {gateway_order_id}. {e}", order.id);
                    Ok(order)
                },
            },
            _ => Ok(order),
        }
    }
}

fn linked_consistently(order: &Order, payment: &PaymentEntity) -> bool {
    match (order.gateway_order_id.as_deref(), payment.order_id.as_deref()) {
        (Some(ours), Some(theirs)) => ours == theirs,
        _ => true,
    }
}
