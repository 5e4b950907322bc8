//! Error taxonomy for the checkout-to-payment flow.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("insufficient stock for product {0}")]
    InsufficientStock(Uuid),

    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("callback signature verification failed")]
    SignatureInvalid,

    #[error("no order found for gateway reference {0}")]
    OrderNotFound(String),

    #[error("no payment record for order {0}")]
    PaymentRecordMissing(Uuid),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("notification failed: {0}")]
    Notification(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for CommerceError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl IntoResponse for CommerceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::EmptyCart | Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InsufficientStock(_) => StatusCode::CONFLICT,
            Self::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::SignatureInvalid => StatusCode::BAD_REQUEST,
            Self::OrderNotFound(_) | Self::PaymentRecordMissing(_) => StatusCode::NOT_FOUND,
            Self::Notification(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, CommerceError>;
