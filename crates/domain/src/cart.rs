//! Shopping cart aggregate.
//!
//! A [`Cart`] never changes in place. Mutations happen on a [`CartDraft`],
//! and the only way back to a `Cart` is [`CartDraft::commit`], which
//! recomputes the totals. Repositories only accept `Cart`, so a cart with
//! stale totals cannot be persisted.

use chrono::{DateTime, Utc};
use common::{CartLineId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Item not found in cart: {0}")]
    LineNotFound(CartLineId),

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Quantity for one item cannot exceed {}", u32::MAX)]
    QuantityTooLarge,
}

/// One selected (product, size, color) with its quantity and price snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
    /// Discounted unit price at the time the line was added.
    pub price: Money,
}

impl CartLine {
    /// Returns true if this line holds the same product variant.
    pub fn is_variant(&self, product_id: ProductId, size: Option<&str>, color: Option<&str>) -> bool {
        self.product_id == product_id
            && self.size.as_deref() == size
            && self.color.as_deref() == color
    }

    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// Derived cart totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub total_items: u32,
    pub total_price: Money,
}

/// `totalItems = Σ quantity`, `totalPrice = Σ price × quantity`.
pub fn compute_totals(lines: &[CartLine]) -> CartTotals {
    CartTotals {
        total_items: lines
            .iter()
            .fold(0, |total, line| total.saturating_add(line.quantity)),
        total_price: lines.iter().map(CartLine::line_total).sum(),
    }
}

/// A user's cart as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    user_id: UserId,
    items: Vec<CartLine>,
    #[serde(flatten)]
    totals: CartTotals,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            totals: CartTotals::default(),
            updated_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[CartLine] {
        &self.items
    }

    pub fn totals(&self) -> CartTotals {
        self.totals
    }

    pub fn total_items(&self) -> u32 {
        self.totals.total_items
    }

    pub fn total_price(&self) -> Money {
        self.totals.total_price
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Opens the cart for editing.
    pub fn edit(self) -> CartDraft {
        CartDraft { cart: self }
    }
}

/// A cart being edited. Totals are carried over unchanged until [`commit`].
///
/// [`commit`]: CartDraft::commit
#[derive(Debug, Clone)]
pub struct CartDraft {
    cart: Cart,
}

impl CartDraft {
    pub fn lines(&self) -> &[CartLine] {
        &self.cart.items
    }

    /// Totals as last committed. Stale after any mutation.
    pub fn totals(&self) -> CartTotals {
        self.cart.totals
    }

    /// Finds the line holding the given product variant.
    pub fn find_variant(
        &self,
        product_id: ProductId,
        size: Option<&str>,
        color: Option<&str>,
    ) -> Option<&CartLine> {
        self.cart
            .items
            .iter()
            .find(|line| line.is_variant(product_id, size, color))
    }

    pub fn find_line(&self, line_id: CartLineId) -> Option<&CartLine> {
        self.cart.items.iter().find(|line| line.id == line_id)
    }

    /// Adds units of a product variant, merging into an existing line for the
    /// same (product, size, color). A merged line keeps its original price.
    ///
    /// Returns the resulting line quantity.
    pub fn add(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        size: Option<String>,
        color: Option<String>,
        price: Money,
    ) -> Result<u32, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        if let Some(line) = self
            .cart
            .items
            .iter_mut()
            .find(|line| line.is_variant(product_id, size.as_deref(), color.as_deref()))
        {
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or(CartError::QuantityTooLarge)?;
            return Ok(line.quantity);
        }

        self.cart.items.push(CartLine {
            id: CartLineId::new(),
            product_id,
            quantity,
            size,
            color,
            price,
        });
        Ok(quantity)
    }

    /// Sets the quantity of a line.
    pub fn set_quantity(&mut self, line_id: CartLineId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let line = self
            .cart
            .items
            .iter_mut()
            .find(|line| line.id == line_id)
            .ok_or(CartError::LineNotFound(line_id))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Removes every line matching the product variant. Returns how many were removed.
    pub fn remove_variant(
        &mut self,
        product_id: ProductId,
        size: Option<&str>,
        color: Option<&str>,
    ) -> usize {
        let before = self.cart.items.len();
        self.cart
            .items
            .retain(|line| !line.is_variant(product_id, size, color));
        before - self.cart.items.len()
    }

    pub fn clear(&mut self) {
        self.cart.items.clear();
    }

    /// Recomputes totals and closes the draft.
    pub fn commit(mut self) -> Cart {
        self.cart.totals = compute_totals(&self.cart.items);
        self.cart.updated_at = Utc::now();
        self.cart
    }
}
