//! Fulfillment error types.

use common::{OrderId, ProductId, UserId};
use domain::{CartError, OrderError, ProductError, StockError};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur in cart, catalog and order operations.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Checkout was attempted with no cart lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// The user has no cart to modify.
    #[error("Cart not found for user {0}")]
    CartNotFound(UserId),

    /// A product cannot back the requested lines.
    #[error(transparent)]
    Stock(#[from] StockError),

    /// The order rejected the operation.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The cart rejected the edit.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The product record is invalid.
    #[error(transparent)]
    Product(#[from] ProductError),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The caller's role or ownership does not permit the operation.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl FulfillmentError {
    /// Short machine-readable reason, used as a metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            FulfillmentError::EmptyCart => "empty_cart",
            FulfillmentError::CartNotFound(_) => "cart_not_found",
            FulfillmentError::Stock(e) => e.reason(),
            FulfillmentError::Order(_) => "order",
            FulfillmentError::Cart(_) => "cart",
            FulfillmentError::Product(_) => "product",
            FulfillmentError::OrderNotFound(_) => "order_not_found",
            FulfillmentError::ProductNotFound(_) => "product_not_found",
            FulfillmentError::AccessDenied(_) => "access_denied",
            FulfillmentError::Store(_) => "store",
        }
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
