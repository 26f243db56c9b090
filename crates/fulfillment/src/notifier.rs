//! Order notifications.
//!
//! The lifecycle manager calls the notifier after a change has been persisted.
//! Delivery is best-effort: errors and timeouts are logged and counted by the
//! caller, never returned to the client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::OrderId;
use domain::{Order, OrderStatus};
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors a notifier can report.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Receives order events worth telling the customer about.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    /// Called once an order has been placed.
    async fn notify_order_created(&self, order: &Order) -> Result<(), NotifyError>;

    /// Called after a status change has been persisted.
    async fn notify_status_changed(
        &self,
        order: &Order,
        old_status: OrderStatus,
        new_status: OrderStatus,
    ) -> Result<(), NotifyError>;
}

/// Notifier that only writes a log line. Used when no mail relay is configured.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl OrderNotifier for LoggingNotifier {
    async fn notify_order_created(&self, order: &Order) -> Result<(), NotifyError> {
        tracing::info!(
            order_id = %order.id(),
            order_number = order.order_number(),
            email = %order.shipping_address().email,
            total = %order.total_amount(),
            "order confirmation notification"
        );
        Ok(())
    }

    async fn notify_status_changed(
        &self,
        order: &Order,
        old_status: OrderStatus,
        new_status: OrderStatus,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            order_id = %order.id(),
            order_number = order.order_number(),
            email = %order.shipping_address().email,
            from = %old_status,
            to = %new_status,
            "order status notification"
        );
        Ok(())
    }
}

/// A notification recorded by [`InMemoryNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    OrderCreated {
        order_id: OrderId,
    },
    StatusChanged {
        order_id: OrderId,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: Vec<Notification>,
    fail: bool,
    delay: Option<Duration>,
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<Mutex<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures every subsequent call to fail.
    pub async fn set_fail(&self, fail: bool) {
        self.state.lock().await.fail = fail;
    }

    /// Configures every subsequent call to sleep before answering.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().await.delay = delay;
    }

    /// Notifications delivered so far.
    pub async fn sent(&self) -> Vec<Notification> {
        self.state.lock().await.sent.clone()
    }

    async fn record(&self, notification: Notification) -> Result<(), NotifyError> {
        let delay = self.state.lock().await.delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        if state.fail {
            return Err(NotifyError::Delivery("mail relay unavailable".to_string()));
        }
        state.sent.push(notification);
        Ok(())
    }
}

#[async_trait]
impl OrderNotifier for InMemoryNotifier {
    async fn notify_order_created(&self, order: &Order) -> Result<(), NotifyError> {
        self.record(Notification::OrderCreated {
            order_id: order.id(),
        })
        .await
    }

    async fn notify_status_changed(
        &self,
        order: &Order,
        old_status: OrderStatus,
        new_status: OrderStatus,
    ) -> Result<(), NotifyError> {
        self.record(Notification::StatusChanged {
            order_id: order.id(),
            old_status,
            new_status,
        })
        .await
    }
}
