use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use checkout_engine::{helpers::SignatureScheme, CheckoutError};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    InvalidAmount(String),
    #[error("{0}")]
    GatewayUnavailable(String),
    #[error("Payment signature is invalid")]
    InvalidSignature,
    #[error("Webhook rejected. {0}")]
    RejectedWebhook(String),
    #[error("Missing or invalid access token")]
    Unauthorized,
    #[error("Requests from this address are not allowed")]
    ForbiddenPeer,
    #[error("{0}")]
    AmountMismatch(String),
    #[error("The request conflicts with the order's current state. {0}")]
    Conflict(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            Self::RejectedWebhook(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::ForbiddenPeer => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::AmountMismatch(_) => StatusCode::CONFLICT,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::InvalidAmount(_) => Self::InvalidAmount(e.to_string()),
            CheckoutError::GatewayUnavailable { .. } => Self::GatewayUnavailable(e.to_string()),
            CheckoutError::SignatureInvalid(SignatureScheme::Webhook) => Self::RejectedWebhook(e.to_string()),
            CheckoutError::SignatureInvalid(SignatureScheme::ClientCallback) => Self::InvalidSignature,
            CheckoutError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            CheckoutError::AmountMismatch { .. } => Self::AmountMismatch(e.to_string()),
            CheckoutError::MalformedPayload(_) => Self::InvalidRequestBody(e.to_string()),
            CheckoutError::AlreadyProcessed(_) |
            CheckoutError::InvalidTransition { .. } |
            CheckoutError::PaymentNotCaptured { .. } => Self::Conflict(e.to_string()),
            CheckoutError::DatabaseError(_) => {
                error!("💻️ {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}
