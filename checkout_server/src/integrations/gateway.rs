use checkout_engine::traits::{GatewayError, GatewayOrder, GatewayOrderRequest, PaymentAttempt, PaymentGateway};
use gateway_tools::{GatewayApi, GatewayApiError, GatewayConfig, GatewayOrderEntity, GatewayPayment, NewGatewayOrder};
use log::*;
use serde_json::json;

/// The hosted gateway's REST client, seen through the engine's [`PaymentGateway`] contract.
#[derive(Clone)]
pub struct GatewayClient {
    api: GatewayApi,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let api = GatewayApi::new(config)?;
        Ok(Self { api })
    }

    pub fn api(&self) -> &GatewayApi {
        &self.api
    }
}

impl PaymentGateway for GatewayClient {
    async fn create_gateway_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder, GatewayError> {
        let order = new_gateway_order(request);
        debug!("🏦️ Creating gateway order for receipt {}", order.receipt);
        let entity = self.api.create_order(&order).await.map_err(to_gateway_error)?;
        info!("🏦️ Gateway order {} created for receipt {}", entity.id, order.receipt);
        to_gateway_order(entity)
    }

    async fn fetch_order_payment(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
    ) -> Result<Option<PaymentAttempt>, GatewayError> {
        let payments = self.api.fetch_order_payments(gateway_order_id).await.map_err(to_gateway_error)?;
        debug!("🏦️ Gateway order {gateway_order_id} has {} payment attempts", payments.len());
        payments
            .into_iter()
            .find(|p| p.id == payment_id)
            .map(|p| to_payment_attempt(gateway_order_id, p))
            .transpose()
    }
}

pub fn new_gateway_order(request: GatewayOrderRequest) -> NewGatewayOrder {
    NewGatewayOrder {
        amount: request.amount,
        currency: request.currency,
        receipt: request.receipt,
        notes: json!({ "orderId": request.notes.order_id }),
    }
}

fn to_gateway_order(entity: GatewayOrderEntity) -> Result<GatewayOrder, GatewayError> {
    let payload = serde_json::to_value(&entity).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
    Ok(GatewayOrder { id: entity.id, amount: entity.amount, currency: entity.currency, status: entity.status, payload })
}

fn to_payment_attempt(gateway_order_id: &str, payment: GatewayPayment) -> Result<PaymentAttempt, GatewayError> {
    let payload = serde_json::to_value(&payment).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
    Ok(PaymentAttempt {
        id: payment.id,
        gateway_order_id: payment.order_id.unwrap_or_else(|| gateway_order_id.to_string()),
        amount: payment.amount,
        status: payment.status,
        payload,
    })
}

pub fn to_gateway_error(e: GatewayApiError) -> GatewayError {
    warn!("🏦️ Gateway request failed. {e}");
    match e {
        e if e.is_transient() => GatewayError::Unavailable(e.to_string()),
        GatewayApiError::QueryError { status, message } => GatewayError::Rejected { status, message },
        GatewayApiError::JsonError(s) => GatewayError::InvalidResponse(s),
        e => GatewayError::Unavailable(e.to_string()),
    }
}
