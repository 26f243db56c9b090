use async_trait::async_trait;
use common::{OrderId, ProductId, UserId};
use domain::{Cart, Order, OrderStatus, Product, User};

use crate::{OrderQuery, Page, Result};

/// Access to catalog products.
///
/// Stock is only ever changed through the single-statement stock operations
/// below, never by writing back a product that was read earlier, so that
/// concurrent reservations against the same product cannot lose updates.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists products, newest first.
    async fn list_products(&self, active_only: bool) -> Result<Vec<Product>>;

    /// Inserts a product with its initial stock count, or replaces the details
    /// of an existing one. An existing product keeps its stored stock count.
    async fn save_product(&self, product: &Product) -> Result<()>;

    /// Decrements stock by `quantity` only if at least `quantity` units remain.
    ///
    /// Returns `false` (and changes nothing) if the product is missing or the
    /// stock is too low.
    async fn try_decrement_stock(&self, id: ProductId, quantity: u32) -> Result<bool>;

    /// Increments stock by `quantity`. Returns `false` if the product is missing.
    async fn increment_stock(&self, id: ProductId, quantity: u32) -> Result<bool>;

    /// Overwrites the stock count. Returns `false` if the product is missing.
    async fn set_stock(&self, id: ProductId, stock: u32) -> Result<bool>;
}

/// Access to per-user carts.
///
/// Only committed [`Cart`] values can be saved, so persisted totals always
/// match the persisted lines.
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>>;

    async fn save_cart(&self, cart: &Cart) -> Result<()>;
}

/// Access to order records.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts a new order. Fails with `DuplicateOrderNumber` on a number clash.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Replaces an existing order, but only while its stored status is still
    /// `expected_status`.
    ///
    /// Returns `false` if the order does not exist or its status has changed
    /// since it was read. Callers use this to make each status transition
    /// happen at most once under concurrent requests.
    async fn update_order(&self, order: &Order, expected_status: OrderStatus) -> Result<bool>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists a user's orders, newest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Filtered, sorted and paginated listing for administrators.
    async fn query_orders(&self, query: &OrderQuery) -> Result<Page<Order>>;

    /// Permanently removes an order whose stored status is `expected_status`.
    /// Returns `false` if no such order exists.
    async fn delete_order(&self, id: OrderId, expected_status: OrderStatus) -> Result<bool>;
}

/// Access to user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    async fn upsert_user(&self, user: &User) -> Result<()>;
}

/// Everything the services need from a backing store.
pub trait Store:
    ProductRepository + CartRepository + OrderRepository + UserRepository + Clone + 'static
{
}

impl<T> Store for T where
    T: ProductRepository + CartRepository + OrderRepository + UserRepository + Clone + 'static
{
}
