//! Domain error types.

use common::{OrderNumber, ProductCode, Run, ShipmentStatus};
use store::StoreError;
use thiserror::Error;

use crate::cart::CartError;
use crate::reservation::ReservationError;
use crate::validation::ValidationError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A form failed validation; nothing was written.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A cart operation was rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Not enough unheld stock.
    #[error("Stock hold error: {0}")]
    Reservation(#[from] ReservationError),

    /// The requested status change is not in the lifecycle.
    #[error("Order {number} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        number: OrderNumber,
        from: ShipmentStatus,
        to: ShipmentStatus,
    },

    /// Product not found.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductCode),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(Run),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderNumber),

    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
