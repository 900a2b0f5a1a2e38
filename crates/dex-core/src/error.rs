//! Error types for dex-core.

use crate::order::OrderId;
use thiserror::Error;

/// Core error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid order side: {0}")]
    InvalidSide(String),

    #[error("Duplicate order id in ledger state: {0}")]
    DuplicateOrderId(OrderId),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
