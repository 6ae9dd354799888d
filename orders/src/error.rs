use crate::model::ModelId;
use http::StatusCode;
use thiserror::Error;

/// Error taxonomy for the order/inventory workflow. Every variant maps to an
/// HTTP status plus a single human-readable message.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock { product_id: ModelId, requested: i32 },

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    UnsupportedOperation(String),

    #[error("{0}")]
    Authorization(String),

    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl OrderError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OrderError::Validation(_) => StatusCode::BAD_REQUEST,
            OrderError::NotFound(_) => StatusCode::NOT_FOUND,
            // Conflict rather than the source's 404: the reservation-style
            // decrement makes "someone else got the stock first" an explicit
            // conflict outcome.
            OrderError::InsufficientStock { .. } => StatusCode::CONFLICT,
            OrderError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            OrderError::UnsupportedOperation(_) => StatusCode::BAD_REQUEST,
            OrderError::Authorization(_) => StatusCode::FORBIDDEN,
            OrderError::PaymentProvider(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OrderError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        OrderError::NotFound(what.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        OrderError::Validation(msg.into())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for OrderError {
    fn from(e: Box<dyn std::error::Error + Send + Sync>) -> Self {
        OrderError::Storage(e.to_string())
    }
}

pub type OrderResult<T> = Result<T, OrderError>;
