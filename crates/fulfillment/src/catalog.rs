//! Catalog reads and partner/admin product writes.

use chrono::Utc;
use common::ProductId;
use domain::{NewProduct, Product, ProductUpdate, Role, User};
use store::Store;

use crate::error::{FulfillmentError, Result};

#[derive(Clone)]
pub struct CatalogService<S> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Active products, newest first.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.store.list_products(true).await?)
    }

    pub async fn get_product(&self, product_id: ProductId) -> Result<Product> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or(FulfillmentError::ProductNotFound(product_id))
    }

    /// Lists a new product authored by `actor`.
    #[tracing::instrument(skip(self, actor, new), fields(actor = %actor.id))]
    pub async fn create_product(&self, actor: &User, new: NewProduct) -> Result<Product> {
        if !actor.role.can_sell() {
            return Err(FulfillmentError::AccessDenied(
                "Only partners and admins can list products".to_string(),
            ));
        }
        let product = Product::create(new, actor.id, Utc::now())?;
        self.store.save_product(&product).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Applies an allow-listed update. Partners may only edit their own products.
    #[tracing::instrument(skip(self, actor, update), fields(actor = %actor.id))]
    pub async fn update_product(
        &self,
        actor: &User,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product> {
        let mut product = self.get_product(product_id).await?;
        let allowed = match actor.role {
            Role::Admin => true,
            Role::Partner => product.author == actor.id,
            Role::Customer => false,
        };
        if !allowed {
            return Err(FulfillmentError::AccessDenied(
                "You can only update your own products".to_string(),
            ));
        }

        // Stock is written on its own so reservations made since the read survive.
        let stock = update.stock;
        product.apply_update(update, Utc::now())?;
        self.store.save_product(&product).await?;
        if let Some(stock) = stock {
            if !self.store.set_stock(product_id, stock).await? {
                return Err(FulfillmentError::ProductNotFound(product_id));
            }
        }
        tracing::info!("product updated");
        self.get_product(product_id).await
    }
}
