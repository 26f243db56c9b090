//! Order line snapshots and order totals.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Fixed GST rate applied to every order subtotal.
pub const TAX_RATE_PERCENT: u32 = 18;

/// Flat shipping policy: shipping is free.
pub const SHIPPING_CHARGE: Money = Money::zero();

/// A product snapshot embedded in an order at creation time.
///
/// Later edits to the product never reach this copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Unit price after discount.
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl OrderLine {
    /// Returns the total for this line (quantity * price).
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// Financial totals, computed once when the order is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping_charge: Money,
    pub total_amount: Money,
}

impl OrderTotals {
    /// `tax = round(subtotal × 18%)` to the minor unit, and
    /// `total = subtotal + tax + shipping`.
    pub fn from_subtotal(subtotal: Money) -> Self {
        let tax = subtotal.percent(TAX_RATE_PERCENT);
        let shipping_charge = SHIPPING_CHARGE;
        Self {
            subtotal,
            tax,
            shipping_charge,
            total_amount: subtotal + tax + shipping_charge,
        }
    }

    pub fn from_lines(lines: &[OrderLine]) -> Self {
        Self::from_subtotal(lines.iter().map(OrderLine::line_total).sum())
    }
}
