use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::GatewayConfig,
    data_objects::{GatewayOrderEntity, GatewayPayment, NewGatewayOrder, PaymentCollection},
    helpers::error_message,
    GatewayApiError,
};

#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, GatewayApiError> {
        let url = self.url(path);
        trace!("🏦️ Sending REST query: {method} {url}");
        let mut req = self
            .client
            .request(method, url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()));
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayApiError::Timeout(e.to_string())
            } else {
                GatewayApiError::RestResponseError(e.to_string())
            }
        })?;
        if response.status().is_success() {
            trace!("🏦️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
            Err(GatewayApiError::QueryError { status, message: error_message(&body) })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    pub async fn create_order(&self, order: &NewGatewayOrder) -> Result<GatewayOrderEntity, GatewayApiError> {
        debug!("🏦️ Creating gateway order for {} {} ({})", order.amount, order.currency, order.receipt);
        let result = self.rest_query::<GatewayOrderEntity, _>(Method::POST, "/orders", &[], Some(order)).await?;
        info!("🏦️ Created gateway order {} for {}", result.id, result.amount);
        Ok(result)
    }

    /// All payment attempts made against a gateway order.
    pub async fn fetch_order_payments(&self, order_id: &str) -> Result<Vec<GatewayPayment>, GatewayApiError> {
        let path = format!("/orders/{order_id}/payments");
        debug!("🏦️ Fetching payments for gateway order {order_id}");
        let result = self.rest_query::<PaymentCollection, ()>(Method::GET, &path, &[], None).await?;
        Ok(result.items)
    }
}
