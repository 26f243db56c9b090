//! Inventory reservation.
//!
//! Reservation runs in two phases. The validate phase reads every product and
//! checks each requested line plus the aggregated demand per product, without
//! touching stock. Only if the whole batch passes does the apply phase issue
//! one conditional decrement per product. A decrement that loses a race with
//! another checkout fails the batch, and the decrements already applied are
//! released again before the error is returned.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use common::ProductId;
use domain::{CartLine, Money, OrderLine, Product, StockError};
use store::ProductRepository;

use crate::error::{FulfillmentError, Result};

/// One line to reserve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl From<&CartLine> for ReservationRequest {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            quantity: line.quantity,
            size: line.size.clone(),
            color: line.color.clone(),
        }
    }
}

/// A reserved line with the product data snapshotted at reservation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
    /// Discounted unit price at reservation time.
    pub unit_price: Money,
    pub image: Option<String>,
}

impl From<ReservedLine> for OrderLine {
    fn from(line: ReservedLine) -> Self {
        OrderLine {
            product_id: line.product_id,
            name: line.name,
            quantity: line.quantity,
            size: line.size,
            color: line.color,
            price: line.unit_price,
            image: line.image,
        }
    }
}

/// Validates and applies stock reservations against the catalog.
#[derive(Clone)]
pub struct InventoryReservationEngine<S> {
    store: S,
}

impl<S: ProductRepository> InventoryReservationEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reserves stock for every request, or for none of them.
    #[tracing::instrument(skip(self, requests), fields(lines = requests.len()))]
    pub async fn reserve(&self, requests: &[ReservationRequest]) -> Result<Vec<ReservedLine>> {
        let (reserved, demand) = match self.validate(requests).await {
            Ok(validated) => validated,
            Err(e) => {
                metrics::counter!("stock_reservation_failures_total", "reason" => e.reason())
                    .increment(1);
                tracing::debug!(error = %e, "reservation rejected during validation");
                return Err(e);
            }
        };

        self.apply(&demand).await?;

        metrics::counter!("stock_reservations_total").increment(1);
        Ok(reserved)
    }

    /// Puts stock back for each (product, quantity) pair.
    ///
    /// Every pair is attempted even if an earlier one fails; the first store
    /// error is returned afterwards. Returns the number of units released.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn release(&self, lines: &[(ProductId, u32)]) -> Result<u32> {
        let mut released = 0u32;
        let mut first_error = None;

        for &(product_id, quantity) in lines {
            match self.store.increment_stock(product_id, quantity).await {
                Ok(true) => released = released.saturating_add(quantity),
                Ok(false) => {
                    tracing::warn!(%product_id, quantity, "cannot release stock for missing product");
                }
                Err(e) => {
                    tracing::error!(%product_id, quantity, error = %e, "stock release failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        metrics::counter!("stock_released_units_total").increment(u64::from(released));
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(released),
        }
    }

    /// Validate phase: no writes.
    async fn validate(
        &self,
        requests: &[ReservationRequest],
    ) -> Result<(Vec<ReservedLine>, Vec<(ProductId, u32)>)> {
        let mut products: HashMap<ProductId, Product> = HashMap::new();
        let mut demand: Vec<(ProductId, u32)> = Vec::new();
        let mut reserved = Vec::with_capacity(requests.len());

        for request in requests {
            let product = match products.entry(request.product_id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let product = self.store.get_product(request.product_id).await?.ok_or(
                        StockError::NotFound {
                            product_id: request.product_id,
                        },
                    )?;
                    entry.insert(product)
                }
            };

            let size = non_empty(request.size.as_deref());
            let color = non_empty(request.color.as_deref());
            product.validate_selection(size, color)?;

            match demand.iter_mut().find(|(id, _)| *id == product.id) {
                Some((_, total)) => {
                    *total = product.ensure_available_with(*total, request.quantity)?;
                }
                None => demand.push((product.id, request.quantity)),
            }

            reserved.push(ReservedLine {
                product_id: product.id,
                name: product.name.clone(),
                quantity: request.quantity,
                size: size.map(String::from),
                color: color.map(String::from),
                unit_price: product.unit_price(),
                image: product.primary_image().map(String::from),
            });
        }

        for &(product_id, total) in &demand {
            if let Some(product) = products.get(&product_id) {
                product.ensure_available(total)?;
            }
        }

        Ok((reserved, demand))
    }

    /// Apply phase: conditional decrements with compensation on failure.
    async fn apply(&self, demand: &[(ProductId, u32)]) -> Result<()> {
        let mut applied: Vec<(ProductId, u32)> = Vec::with_capacity(demand.len());

        for &(product_id, quantity) in demand {
            let outcome = self.store.try_decrement_stock(product_id, quantity).await;
            let failure = match outcome {
                Ok(true) => {
                    applied.push((product_id, quantity));
                    continue;
                }
                Ok(false) => self.lost_race(product_id, quantity).await,
                Err(e) => FulfillmentError::Store(e),
            };

            metrics::counter!("stock_reservation_failures_total", "reason" => failure.reason())
                .increment(1);
            self.compensate(&applied).await;
            return Err(failure);
        }

        Ok(())
    }

    /// Builds the error for a decrement that found too little stock.
    async fn lost_race(&self, product_id: ProductId, quantity: u32) -> FulfillmentError {
        match self.store.get_product(product_id).await {
            Ok(Some(product)) => StockError::InsufficientStock {
                product_id,
                name: product.name,
                requested: quantity,
                available: product.stock,
            }
            .into(),
            Ok(None) => StockError::NotFound { product_id }.into(),
            Err(e) => e.into(),
        }
    }

    async fn compensate(&self, applied: &[(ProductId, u32)]) {
        if applied.is_empty() {
            return;
        }
        metrics::counter!("stock_compensations_total").increment(1);
        tracing::warn!(lines = applied.len(), "releasing partially applied reservation");
        if let Err(e) = self.release(applied).await {
            tracing::error!(error = %e, "compensating release failed");
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
