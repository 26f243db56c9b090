//! Order entity.

use chrono::{DateTime, SecondsFormat, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

use super::{
    OrderError, OrderLine, OrderStatus, OrderTotals, PaymentMethod, PaymentStatus,
    ShippingAddress, number::generate_order_number,
};

/// Default reason recorded when a customer cancels without giving one.
pub const CUSTOMER_CANCEL_REASON: &str = "Cancelled by user";

/// Reason recorded when an admin soft-deletes an order.
pub const ADMIN_DELETE_REASON: &str = "Deleted by admin";

/// Everything needed to place an order once stock has been reserved.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// Result of an admin status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
}

impl StatusChange {
    pub fn is_noop(&self) -> bool {
        self.old_status == self.new_status
    }

    /// Stock goes back to the shelf only when this change cancelled the order.
    pub fn releases_stock(&self) -> bool {
        self.new_status == OrderStatus::Cancelled && self.old_status != OrderStatus::Cancelled
    }
}

/// An order record.
///
/// The line list and totals are fixed at creation; only status, payment flag,
/// tracking, notes and timestamps change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    order_number: String,
    user_id: UserId,
    items: Vec<OrderLine>,
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    order_status: OrderStatus,
    #[serde(flatten)]
    totals: OrderTotals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    order_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delivered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cancellation_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[OrderLine] {
        &self.items
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn status(&self) -> OrderStatus {
        self.order_status
    }

    pub fn totals(&self) -> OrderTotals {
        self.totals
    }

    pub fn subtotal(&self) -> Money {
        self.totals.subtotal
    }

    pub fn tax(&self) -> Money {
        self.totals.tax
    }

    pub fn shipping_charge(&self) -> Money {
        self.totals.shipping_charge
    }

    pub fn total_amount(&self) -> Money {
        self.totals.total_amount
    }

    pub fn notes(&self) -> Option<&str> {
        self.order_notes.as_deref()
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Total number of units across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |total, line| total.saturating_add(line.quantity))
    }

    /// The (product, quantity) pairs to put back on the shelf if this order
    /// is cancelled or purged.
    pub fn stock_lines(&self) -> Vec<(ProductId, u32)> {
        self.items
            .iter()
            .map(|line| (line.product_id, line.quantity))
            .collect()
    }
}

// Command methods
impl Order {
    /// Builds a new order in `Processing` from reserved lines.
    pub fn place(cmd: PlaceOrder, now: DateTime<Utc>) -> Result<Order, OrderError> {
        if cmd.lines.is_empty() {
            return Err(OrderError::NoItems);
        }
        let shipping_address = cmd.shipping_address.normalize()?;
        let totals = OrderTotals::from_lines(&cmd.lines);

        Ok(Order {
            id: OrderId::new(),
            order_number: generate_order_number(now),
            user_id: cmd.user_id,
            items: cmd.lines,
            shipping_address,
            payment_method: cmd.payment_method,
            payment_status: cmd.payment_method.initial_status(),
            order_status: OrderStatus::Processing,
            totals,
            order_notes: non_empty(cmd.notes),
            tracking_number: None,
            delivered_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Draws a fresh order number. Used when the stored one collided.
    pub fn renumber(&mut self, now: DateTime<Utc>) {
        self.order_number = generate_order_number(now);
    }

    /// Applies an admin status update.
    ///
    /// The caller must release stock when [`StatusChange::releases_stock`] is
    /// true, and only then.
    pub fn update_status(
        &mut self,
        new_status: OrderStatus,
        notes: Option<String>,
        tracking_number: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<StatusChange, OrderError> {
        let old_status = self.order_status;
        if !old_status.can_transition_to(new_status) {
            return Err(OrderError::InvalidTransition {
                current_state: old_status,
                action: format!("move to {new_status}"),
            });
        }

        let notes = non_empty(notes);
        if let Some(tracking_number) = non_empty(tracking_number) {
            self.tracking_number = Some(tracking_number);
        }
        if let Some(note) = &notes {
            self.append_admin_note(note, now);
        }

        self.order_status = new_status;
        let change = StatusChange {
            old_status,
            new_status,
        };
        if !change.is_noop() {
            match new_status {
                OrderStatus::Delivered => {
                    self.delivered_at = Some(now);
                    self.payment_status = PaymentStatus::Paid;
                }
                OrderStatus::Cancelled => {
                    self.cancelled_at = Some(now);
                    if notes.is_some() {
                        self.cancellation_reason = notes;
                    }
                }
                _ => {}
            }
        }
        self.updated_at = now;
        Ok(change)
    }

    /// Customer-initiated cancellation. Returns the status the order left.
    pub fn cancel(
        &mut self,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<OrderStatus, OrderError> {
        if !self.order_status.can_cancel() {
            return Err(OrderError::InvalidTransition {
                current_state: self.order_status,
                action: "cancel".to_string(),
            });
        }
        let reason = non_empty(reason).unwrap_or_else(|| CUSTOMER_CANCEL_REASON.to_string());
        Ok(self.mark_cancelled(reason, now))
    }

    /// Admin soft delete: marks the order cancelled whatever its status.
    /// Returns the status the order left.
    pub fn soft_delete(&mut self, now: DateTime<Utc>) -> OrderStatus {
        self.mark_cancelled(ADMIN_DELETE_REASON.to_string(), now)
    }

    /// Checks the hard-delete guard. On success returns whether the order
    /// still holds stock that must be released before it is purged.
    pub fn check_hard_delete(&self) -> Result<bool, OrderError> {
        if !self.order_status.can_hard_delete() {
            return Err(OrderError::Forbidden(format!(
                "Cannot permanently delete {} orders",
                self.order_status.as_str().to_lowercase()
            )));
        }
        Ok(self.order_status != OrderStatus::Cancelled)
    }

    fn mark_cancelled(&mut self, reason: String, now: DateTime<Utc>) -> OrderStatus {
        let old_status = self.order_status;
        self.order_status = OrderStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.cancellation_reason = Some(reason);
        self.updated_at = now;
        old_status
    }

    fn append_admin_note(&mut self, note: &str, now: DateTime<Utc>) {
        let entry = format!(
            "[Admin Update - {}]: {note}",
            now.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        self.order_notes = Some(match self.order_notes.take() {
            Some(existing) => format!("{existing}\n{entry}"),
            None => entry,
        });
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
