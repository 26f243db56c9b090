//! Order entity, status machine and related types.

mod address;
mod aggregate;
mod line;
mod number;
mod payment;
mod status;

pub use address::{DEFAULT_COUNTRY, ShippingAddress};
pub use aggregate::{ADMIN_DELETE_REASON, CUSTOMER_CANCEL_REASON, Order, PlaceOrder, StatusChange};
pub use line::{OrderLine, OrderTotals, SHIPPING_CHARGE, TAX_RATE_PERCENT};
pub use number::generate_order_number;
pub use payment::{PaymentMethod, PaymentStatus};
pub use status::OrderStatus;

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The requested status is not one of the recognized values.
    #[error("Invalid status: {0}. Must be one of: Processing, Confirmed, Shipped, Delivered, Cancelled")]
    InvalidStatus(String),

    /// Order is not in a state that permits the action.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidTransition {
        current_state: OrderStatus,
        action: String,
    },

    /// The operation is blocked by policy.
    #[error("{0}")]
    Forbidden(String),

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// A required shipping address field is missing.
    #[error("Shipping address field '{field}' is required")]
    InvalidAddress { field: &'static str },
}
