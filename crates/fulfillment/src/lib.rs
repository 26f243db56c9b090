//! Cart, catalog and order lifecycle services.
//!
//! The [`OrderLifecycleManager`] owns every order status change together with
//! its stock side effects. Stock moves only through the
//! [`InventoryReservationEngine`], which reserves a checkout all-or-nothing.

pub mod cart;
pub mod catalog;
pub mod error;
pub mod lifecycle;
pub mod notifier;
pub mod reservation;

pub use cart::{AddToCart, CartService};
pub use catalog::CatalogService;
pub use error::{FulfillmentError, Result};
pub use lifecycle::{
    CreateOrder, DeleteOutcome, LifecycleConfig, OrderLifecycleManager, UpdateStatus,
};
pub use notifier::{InMemoryNotifier, LoggingNotifier, Notification, NotifyError, OrderNotifier};
pub use reservation::{InventoryReservationEngine, ReservationRequest, ReservedLine};
