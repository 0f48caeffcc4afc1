use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("The gateway did not respond in time. {0}")]
    Timeout(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl GatewayApiError {
    /// Whether the failure says something about the gateway's availability rather than about our request.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayApiError::RestResponseError(_) | GatewayApiError::Timeout(_) => true,
            GatewayApiError::QueryError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
