//! Domain layer for the storefront order backend.
//!
//! This crate provides the pure domain model:
//! - `Money` fixed-point amounts
//! - Catalog products with category size tables and selection/stock checks
//! - The cart aggregate with draft/commit total recomputation
//! - The order entity and its status state machine
//! - Users and roles

pub mod cart;
pub mod money;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartDraft, CartError, CartLine, CartTotals, compute_totals};
pub use money::Money;
pub use order::{
    Order, OrderError, OrderLine, OrderStatus, OrderTotals, PaymentMethod, PaymentStatus,
    PlaceOrder, ShippingAddress, StatusChange,
};
pub use product::{Category, Gender, NewProduct, Product, ProductError, ProductUpdate, StockError};
pub use user::{Role, User};
