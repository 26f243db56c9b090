//! Order lifecycle management.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use common::{OrderId, ProductId, UserId};
use domain::{
    Order, OrderError, OrderLine, OrderStatus, PaymentMethod, PlaceOrder, ShippingAddress,
};
use store::{OrderQuery, Page, Store, StoreError};

use crate::error::{FulfillmentError, Result};
use crate::notifier::{NotifyError, OrderNotifier};
use crate::reservation::{InventoryReservationEngine, ReservationRequest};

/// How many times an order insert is retried after an order-number clash.
const ORDER_NUMBER_ATTEMPTS: u32 = 3;

/// Tunables for the lifecycle manager.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// When true, an admin soft delete cancels and releases stock whatever
    /// the order's status, including shipped and delivered orders. When false
    /// it is subject to the same guard as a customer cancellation.
    pub soft_delete_releases_stock: bool,
    /// Upper bound on each notifier call.
    pub notify_timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            soft_delete_releases_stock: true,
            notify_timeout: Duration::from_millis(2000),
        }
    }
}

/// Checkout request.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub user_id: UserId,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// Admin status update request. `status` is the raw value from the client.
#[derive(Debug, Clone)]
pub struct UpdateStatus {
    pub order_id: OrderId,
    pub status: String,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
}

/// Result of an admin delete.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// The order was marked cancelled and kept.
    SoftDeleted(Order),
    /// The order record was removed.
    Purged,
}

/// Owns the order state machine and its side effects on stock and carts.
pub struct OrderLifecycleManager<S: Store> {
    store: S,
    reservations: InventoryReservationEngine<S>,
    notifier: Arc<dyn OrderNotifier>,
    config: LifecycleConfig,
}

impl<S: Store> Clone for OrderLifecycleManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            reservations: self.reservations.clone(),
            notifier: Arc::clone(&self.notifier),
            config: self.config.clone(),
        }
    }
}

impl<S: Store> OrderLifecycleManager<S> {
    pub fn new(store: S, notifier: Arc<dyn OrderNotifier>, config: LifecycleConfig) -> Self {
        Self {
            reservations: InventoryReservationEngine::new(store.clone()),
            store,
            notifier,
            config,
        }
    }

    pub fn reservations(&self) -> &InventoryReservationEngine<S> {
        &self.reservations
    }

    // Command methods

    /// Converts the user's cart into an order.
    ///
    /// Stock is reserved for every line or none. Once stock is reserved the
    /// order is either persisted or the reservation is released again.
    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id))]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order> {
        let started = Instant::now();
        let result = self.place_order(cmd).await;
        metrics::histogram!("order_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(
                    order_id = %order.id(),
                    order_number = order.order_number(),
                    total = %order.total_amount(),
                    "order placed"
                );
            }
            Err(e) => {
                metrics::counter!("order_create_failures_total", "reason" => e.reason())
                    .increment(1);
                tracing::warn!(error = %e, "order creation failed");
            }
        }
        result
    }

    async fn place_order(&self, cmd: CreateOrder) -> Result<Order> {
        let cart = self
            .store
            .get_cart(cmd.user_id)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or(FulfillmentError::EmptyCart)?;

        // Reject a bad address before any stock moves.
        let shipping_address = cmd.shipping_address.normalize()?;

        let requests: Vec<ReservationRequest> =
            cart.items().iter().map(ReservationRequest::from).collect();
        let reserved = self.reservations.reserve(&requests).await?;
        let lines: Vec<OrderLine> = reserved.into_iter().map(OrderLine::from).collect();

        let placed = Order::place(
            PlaceOrder {
                user_id: cmd.user_id,
                lines,
                shipping_address,
                payment_method: cmd.payment_method,
                notes: cmd.notes,
            },
            Utc::now(),
        );
        let mut order = match placed {
            Ok(order) => order,
            Err(e) => {
                self.compensate_reservation(&requests_to_lines(&requests))
                    .await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.insert_with_fresh_number(&mut order).await {
            tracing::error!(error = %e, "order insert failed after stock was reserved");
            self.compensate_reservation(&order.stock_lines()).await;
            return Err(e.into());
        }

        let mut draft = cart.edit();
        draft.clear();
        if let Err(e) = self.store.save_cart(&draft.commit()).await {
            tracing::error!(
                order_id = %order.id(),
                error = %e,
                "order placed but cart could not be cleared"
            );
        }

        self.dispatch("order_created", self.notifier.notify_order_created(&order))
            .await;
        Ok(order)
    }

    async fn insert_with_fresh_number(
        &self,
        order: &mut Order,
    ) -> std::result::Result<(), StoreError> {
        let mut attempt = 1;
        loop {
            match self.store.insert_order(order).await {
                Err(StoreError::DuplicateOrderNumber(number)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                    tracing::debug!(order_number = %number, attempt, "order number collision");
                    order.renumber(Utc::now());
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn compensate_reservation(&self, lines: &[(ProductId, u32)]) {
        metrics::counter!("stock_compensations_total").increment(1);
        tracing::warn!(lines = lines.len(), "releasing stock reserved for an unsaved order");
        if let Err(e) = self.reservations.release(lines).await {
            tracing::error!(error = %e, "compensating release failed");
        }
    }

    /// Admin status update.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, status = %cmd.status))]
    pub async fn update_status(&self, cmd: UpdateStatus) -> Result<Order> {
        let new_status = OrderStatus::parse(&cmd.status)
            .ok_or_else(|| OrderError::InvalidStatus(cmd.status.clone()))?;
        let mut order = self.load(cmd.order_id).await?;

        let change = order.update_status(new_status, cmd.notes, cmd.tracking_number, Utc::now())?;
        self.persist(&order, change.old_status).await?;

        if change.releases_stock() {
            self.release_order_stock(&order).await;
            metrics::counter!("orders_cancelled_total", "source" => "admin").increment(1);
        }

        if !change.is_noop() {
            metrics::counter!(
                "order_status_transitions_total",
                "from" => change.old_status.as_str(),
                "to" => change.new_status.as_str()
            )
            .increment(1);
            tracing::info!(from = %change.old_status, to = %change.new_status, "order status changed");
            self.dispatch(
                "status_changed",
                self.notifier
                    .notify_status_changed(&order, change.old_status, change.new_status),
            )
            .await;
        }

        Ok(order)
    }

    /// Customer cancellation of their own order.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        user_id: UserId,
        reason: Option<String>,
    ) -> Result<Order> {
        let mut order = self.load_owned(order_id, user_id).await?;

        let old_status = order.cancel(reason, Utc::now())?;
        self.persist(&order, old_status).await?;
        self.release_order_stock(&order).await;

        metrics::counter!("orders_cancelled_total", "source" => "customer").increment(1);
        metrics::counter!(
            "order_status_transitions_total",
            "from" => old_status.as_str(),
            "to" => OrderStatus::Cancelled.as_str()
        )
        .increment(1);
        tracing::info!(from = %old_status, "order cancelled by customer");

        self.dispatch(
            "status_changed",
            self.notifier
                .notify_status_changed(&order, old_status, OrderStatus::Cancelled),
        )
        .await;
        Ok(order)
    }

    /// Admin delete. A hard delete purges the record; a soft delete marks it
    /// cancelled with the admin reason.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, order_id: OrderId, hard_delete: bool) -> Result<DeleteOutcome> {
        let mut order = self.load(order_id).await?;

        if hard_delete {
            let needs_release = order.check_hard_delete()?;
            if !self.store.delete_order(order_id, order.status()).await? {
                return Err(self.concurrent_change(order_id, "delete").await);
            }
            if needs_release {
                self.release_order_stock(&order).await;
            }
            metrics::counter!("orders_deleted_total", "mode" => "hard").increment(1);
            tracing::info!(status = %order.status(), released = needs_release, "order purged");
            return Ok(DeleteOutcome::Purged);
        }

        let old_status = order.status();
        if !self.config.soft_delete_releases_stock && !old_status.can_cancel() {
            return Err(OrderError::InvalidTransition {
                current_state: old_status,
                action: "delete".to_string(),
            }
            .into());
        }

        order.soft_delete(Utc::now());
        self.persist(&order, old_status).await?;
        metrics::counter!("orders_deleted_total", "mode" => "soft").increment(1);

        // An order that was already cancelled has had its stock returned.
        if old_status != OrderStatus::Cancelled {
            self.release_order_stock(&order).await;
            metrics::counter!("orders_cancelled_total", "source" => "admin_delete").increment(1);
            tracing::info!(from = %old_status, "order soft-deleted");
            self.dispatch(
                "status_changed",
                self.notifier
                    .notify_status_changed(&order, old_status, OrderStatus::Cancelled),
            )
            .await;
        }

        Ok(DeleteOutcome::SoftDeleted(order))
    }

    // Query methods

    /// A user's own order. Orders owned by someone else are reported as missing.
    pub async fn get_user_order(&self, order_id: OrderId, user_id: UserId) -> Result<Order> {
        self.load_owned(order_id, user_id).await
    }

    /// A user's orders, newest first.
    pub async fn list_user_orders(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self.store.list_orders_for_user(user_id).await?)
    }

    /// Any order, for administrators.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.load(order_id).await
    }

    /// Filtered, paginated listing for administrators.
    pub async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>> {
        Ok(self.store.query_orders(query).await?)
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))
    }

    async fn load_owned(&self, order_id: OrderId, user_id: UserId) -> Result<Order> {
        let order = self.load(order_id).await?;
        if !order.is_owned_by(user_id) {
            return Err(FulfillmentError::OrderNotFound(order_id));
        }
        Ok(order)
    }

    /// Writes the order back if nobody changed its status in the meantime.
    async fn persist(&self, order: &Order, expected_status: OrderStatus) -> Result<()> {
        if self.store.update_order(order, expected_status).await? {
            return Ok(());
        }
        Err(self.concurrent_change(order.id(), "update").await)
    }

    async fn concurrent_change(&self, order_id: OrderId, action: &str) -> FulfillmentError {
        match self.store.get_order(order_id).await {
            Ok(Some(current)) => {
                tracing::warn!(%order_id, status = %current.status(), "order changed concurrently");
                OrderError::InvalidTransition {
                    current_state: current.status(),
                    action: action.to_string(),
                }
                .into()
            }
            Ok(None) => FulfillmentError::OrderNotFound(order_id),
            Err(e) => e.into(),
        }
    }

    /// Returns an order's units to the shelf. The order's new status is
    /// already persisted, so a failure here is logged rather than returned.
    async fn release_order_stock(&self, order: &Order) {
        if let Err(e) = self.reservations.release(&order.stock_lines()).await {
            tracing::error!(order_id = %order.id(), error = %e, "stock release failed");
        }
    }

    /// Runs a notifier call under the configured timeout, swallowing failures.
    async fn dispatch<F>(&self, kind: &'static str, notification: F)
    where
        F: Future<Output = std::result::Result<(), NotifyError>>,
    {
        match tokio::time::timeout(self.config.notify_timeout, notification).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                metrics::counter!("notifications_failed_total", "kind" => kind).increment(1);
                tracing::warn!(kind, error = %e, "notification failed");
            }
            Err(_) => {
                metrics::counter!("notifications_failed_total", "kind" => kind).increment(1);
                tracing::warn!(
                    kind,
                    timeout_ms = self.config.notify_timeout.as_millis() as u64,
                    "notification timed out"
                );
            }
        }
    }
}

fn requests_to_lines(requests: &[ReservationRequest]) -> Vec<(ProductId, u32)> {
    requests
        .iter()
        .map(|request| (request.product_id, request.quantity))
        .collect()
}
