//! Shared identifier types for the storefront backend.

pub mod types;

pub use types::{CartLineId, OrderId, ProductId, UserId};
