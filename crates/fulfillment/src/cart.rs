//! Cart operations.
//!
//! Every edit opens a [`domain::CartDraft`] and commits it before saving, so a
//! saved cart always carries totals computed from its lines.

use common::{CartLineId, ProductId, UserId};
use domain::{Cart, CartError, Product};
use store::Store;

use crate::error::{FulfillmentError, Result};

/// Request to add units of a product variant.
#[derive(Debug, Clone)]
pub struct AddToCart {
    pub product_id: ProductId,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Clone)]
pub struct CartService<S> {
    store: S,
}

impl<S: Store> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's cart, creating an empty one on first access.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<Cart> {
        if let Some(cart) = self.store.get_cart(user_id).await? {
            return Ok(cart);
        }
        let cart = Cart::new(user_id);
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Adds units to the cart, merging with an identical variant.
    ///
    /// The product must be purchasable in the requested variant and have
    /// enough stock for the resulting line quantity.
    #[tracing::instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn add_item(&self, user_id: UserId, request: AddToCart) -> Result<Cart> {
        if request.quantity == 0 {
            return Err(CartError::InvalidQuantity.into());
        }
        let product = self.product(request.product_id).await?;
        let size = non_empty(request.size);
        let color = non_empty(request.color);
        product.validate_selection(size.as_deref(), color.as_deref())?;

        let mut draft = self.get_cart(user_id).await?.edit();
        let in_cart = draft
            .find_variant(product.id, size.as_deref(), color.as_deref())
            .map_or(0, |line| line.quantity);
        product.ensure_available_with(in_cart, request.quantity)?;

        draft.add(product.id, request.quantity, size, color, product.unit_price())?;
        let cart = draft.commit();
        self.store.save_cart(&cart).await?;

        tracing::debug!(total_items = cart.total_items(), "cart item added");
        Ok(cart)
    }

    /// Sets the quantity of one line. The new quantity must fit current stock.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity.into());
        }
        let cart = self
            .store
            .get_cart(user_id)
            .await?
            .ok_or(FulfillmentError::CartNotFound(user_id))?;
        let mut draft = cart.edit();
        let product_id = draft
            .find_line(line_id)
            .map(|line| line.product_id)
            .ok_or(CartError::LineNotFound(line_id))?;

        let product = self.product(product_id).await?;
        product.ensure_available(quantity)?;

        draft.set_quantity(line_id, quantity)?;
        let cart = draft.commit();
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Removes every line holding the given variant.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        size: Option<String>,
        color: Option<String>,
    ) -> Result<Cart> {
        let cart = self
            .store
            .get_cart(user_id)
            .await?
            .ok_or(FulfillmentError::CartNotFound(user_id))?;
        let mut draft = cart.edit();
        let size = non_empty(size);
        let color = non_empty(color);
        let removed = draft.remove_variant(product_id, size.as_deref(), color.as_deref());

        let cart = draft.commit();
        self.store.save_cart(&cart).await?;
        tracing::debug!(removed, "cart lines removed");
        Ok(cart)
    }

    /// Empties the cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<Cart> {
        let cart = self
            .store
            .get_cart(user_id)
            .await?
            .ok_or(FulfillmentError::CartNotFound(user_id))?;
        let mut draft = cart.edit();
        draft.clear();
        let cart = draft.commit();
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    async fn product(&self, product_id: ProductId) -> Result<Product> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or(FulfillmentError::ProductNotFound(product_id))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
