use thiserror::Error;

use crate::traits::{GatewayOrder, GatewayOrderRequest, PaymentAttempt};

/// The remote payment gateway, as seen by the Gateway Order Adapter and the client-callback path.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Creates an order on the gateway. Implementations should not retry; the caller bounds the call with a timeout.
    async fn create_gateway_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder, GatewayError>;

    /// Looks up payment `payment_id` among the payments made against `gateway_order_id`. `Ok(None)` means the gateway
    /// has no such payment for that order.
    async fn fetch_order_payment(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
    ) -> Result<Option<PaymentAttempt>, GatewayError>;
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The payment gateway could not be reached. {0}")]
    Unavailable(String),
    #[error("The payment gateway rejected the request. Error {status}. {message}")]
    Rejected { status: u16, message: String },
    #[error("The payment gateway returned a response we could not understand. {0}")]
    InvalidResponse(String),
}
