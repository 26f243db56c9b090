use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, ProductId, UserId};
use domain::{Cart, Order, OrderStatus, Product, User};
use tokio::sync::RwLock;

use crate::{
    OrderQuery, OrderSortField, Page, Result, SortOrder, StoreError,
    repository::{CartRepository, OrderRepository, ProductRepository, UserRepository},
};

#[derive(Debug, Default)]
struct InMemoryState {
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, Cart>,
    orders: HashMap<OrderId, Order>,
    users: HashMap<UserId, User>,
    fail_on_insert_order: bool,
    fail_on_save_cart: bool,
}

/// In-memory store for tests and local runs.
///
/// A single lock guards all collections, so every operation (including the
/// conditional stock decrement) is atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `insert_order` fail with `Unavailable`.
    pub async fn set_fail_on_insert_order(&self, fail: bool) {
        self.state.write().await.fail_on_insert_order = fail;
    }

    /// Makes every subsequent `save_cart` fail with `Unavailable`.
    pub async fn set_fail_on_save_cart(&self, fail: bool) {
        self.state.write().await.fail_on_save_cart = fail;
    }

    /// Current stock of a product, if it exists.
    pub async fn stock_of(&self, id: ProductId) -> Option<u32> {
        self.state.read().await.products.get(&id).map(|p| p.stock)
    }

    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

fn newest_first(a: &Order, b: &Order) -> Ordering {
    b.created_at().cmp(&a.created_at())
}

fn compare_by(field: OrderSortField, a: &Order, b: &Order) -> Ordering {
    match field {
        OrderSortField::CreatedAt => a.created_at().cmp(&b.created_at()),
        OrderSortField::TotalAmount => a.total_amount().cmp(&b.total_amount()),
        OrderSortField::OrderNumber => a.order_number().cmp(b.order_number()),
        OrderSortField::OrderStatus => a.status().as_str().cmp(b.status().as_str()),
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn list_products(&self, active_only: bool) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| !active_only || p.is_active)
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn save_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.write().await;
        let mut product = product.clone();
        if let Some(existing) = state.products.get(&product.id) {
            product.stock = existing.stock;
        }
        state.products.insert(product.id, product);
        Ok(())
    }

    async fn try_decrement_stock(&self, id: ProductId, quantity: u32) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.products.get_mut(&id) {
            Some(product) if product.stock >= quantity => {
                product.stock -= quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_stock(&self, id: ProductId, quantity: u32) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.products.get_mut(&id) {
            Some(product) => {
                product.stock = product.stock.saturating_add(quantity);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_stock(&self, id: ProductId, stock: u32) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.products.get_mut(&id) {
            Some(product) => {
                product.stock = stock;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl CartRepository for InMemoryStore {
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        Ok(self.state.read().await.carts.get(&user_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_save_cart {
            return Err(StoreError::Unavailable("cart write rejected".to_string()));
        }
        state.carts.insert(cart.user_id(), cart.clone());
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_insert_order {
            return Err(StoreError::Unavailable("order write rejected".to_string()));
        }
        if state
            .orders
            .values()
            .any(|o| o.order_number() == order.order_number())
        {
            return Err(StoreError::DuplicateOrderNumber(
                order.order_number().to_string(),
            ));
        }
        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn update_order(&self, order: &Order, expected_status: OrderStatus) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.orders.get_mut(&order.id()) {
            Some(existing) if existing.status() == expected_status => {
                *existing = order.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.is_owned_by(user_id))
            .cloned()
            .collect();
        orders.sort_by(newest_first);
        Ok(orders)
    }

    async fn query_orders(&self, query: &OrderQuery) -> Result<Page<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<&Order> = state.orders.values().filter(|o| query.matches(o)).collect();
        orders.sort_by(|a, b| {
            let ordering = compare_by(query.sort_by, a, b);
            match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = orders.len() as u64;
        let items = orders
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, query.page, query.limit, total))
    }

    async fn delete_order(&self, id: OrderId, expected_status: OrderStatus) -> Result<bool> {
        let mut state = self.state.write().await;
        let matches = state
            .orders
            .get(&id)
            .is_some_and(|order| order.status() == expected_status);
        if matches {
            state.orders.remove(&id);
        }
        Ok(matches)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        self.state.write().await.users.insert(user.id, user.clone());
        Ok(())
    }
}
