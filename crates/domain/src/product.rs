//! Catalog products and the stock/selection rules checked against them.

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// Minimum length of a product description.
pub const MIN_DESCRIPTION_LEN: usize = 20;

/// Largest discount percentage a product may carry.
pub const MAX_DISCOUNT_PERCENT: u8 = 90;

/// Product category. Each category fixes the set of sizes a product may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Apparel,
    Electronics,
    Footwear,
    Accessories,
}

impl Category {
    /// Sizes a product in this category is allowed to list.
    pub fn allowed_sizes(&self) -> &'static [&'static str] {
        match self {
            Category::Apparel => &["XS", "S", "M", "L", "XL", "XXL"],
            Category::Footwear => &["6", "7", "8", "9", "10", "11", "12"],
            Category::Accessories => &["S", "M", "L"],
            Category::Electronics => &[],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Apparel => "Apparel",
            Category::Electronics => "Electronics",
            Category::Footwear => "Footwear",
            Category::Accessories => "Accessories",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Unisex,
}

/// Errors raised when a product record would violate catalog rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("Product name is required")]
    NameRequired,

    #[error("Product brand is required")]
    BrandRequired,

    #[error("Description must be at least {min} characters (got {actual})")]
    DescriptionTooShort { min: usize, actual: usize },

    #[error("Price must not be negative")]
    NegativePrice,

    #[error("Invalid discount: {0} (must be between 0 and 90)")]
    InvalidDiscount(u8),

    #[error("Invalid size(s) {sizes:?} for category {category}")]
    InvalidSizes {
        category: Category,
        sizes: Vec<String>,
    },

    #[error("At least one product image is required")]
    ImagesRequired,
}

/// Reasons a product cannot back a requested cart or order line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("Product {product_id} not found")]
    NotFound { product_id: ProductId },

    #[error("Product {name} is not available")]
    Inactive { product_id: ProductId, name: String },

    #[error("Size is required for {name}")]
    SizeRequired { product_id: ProductId, name: String },

    #[error("Size {size} is not available for {name}")]
    InvalidSize {
        product_id: ProductId,
        name: String,
        size: String,
    },

    #[error("Color {color} is not available for {name}")]
    InvalidColor {
        product_id: ProductId,
        name: String,
        color: String,
    },

    #[error("Insufficient stock for {name}. Only {available} available")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },
}

impl StockError {
    /// Short machine-readable reason, used as a metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            StockError::NotFound { .. } => "not_found",
            StockError::Inactive { .. } => "inactive",
            StockError::SizeRequired { .. } => "size_required",
            StockError::InvalidSize { .. } => "invalid_size",
            StockError::InvalidColor { .. } => "invalid_color",
            StockError::InsufficientStock { .. } => "insufficient_stock",
        }
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub category: Category,
    pub gender: Gender,
    pub price: Money,
    pub discount: u8,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub stock: u32,
    pub images: Vec<String>,
    /// Partner or admin who owns the listing.
    pub author: UserId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub brand: String,
    pub category: Category,
    pub gender: Gender,
    pub price: Money,
    #[serde(default)]
    pub discount: u8,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    pub stock: u32,
    pub images: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// The fields a product owner may change. Anything else in a request body is
/// rejected during deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<Category>,
    pub gender: Option<Gender>,
    pub price: Option<Money>,
    pub discount: Option<u8>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
    pub stock: Option<u32>,
    pub images: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl Product {
    /// Validates a creation request and builds the product record.
    pub fn create(
        new: NewProduct,
        author: UserId,
        now: DateTime<Utc>,
    ) -> Result<Product, ProductError> {
        let product = Product {
            id: ProductId::new(),
            name: new.name.trim().to_string(),
            description: new.description,
            brand: new.brand.trim().to_string(),
            category: new.category,
            gender: new.gender,
            price: new.price,
            discount: new.discount,
            sizes: new.sizes,
            colors: new.colors,
            stock: new.stock,
            images: new.images,
            author,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        };
        product.validate()?;
        Ok(product)
    }

    /// Applies an allow-listed update. The merged record is validated before
    /// anything is written back, so a rejected update leaves `self` untouched.
    pub fn apply_update(
        &mut self,
        update: ProductUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), ProductError> {
        let mut next = self.clone();
        if let Some(name) = update.name {
            next.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            next.description = description;
        }
        if let Some(brand) = update.brand {
            next.brand = brand.trim().to_string();
        }
        if let Some(category) = update.category {
            next.category = category;
        }
        if let Some(gender) = update.gender {
            next.gender = gender;
        }
        if let Some(price) = update.price {
            next.price = price;
        }
        if let Some(discount) = update.discount {
            next.discount = discount;
        }
        if let Some(sizes) = update.sizes {
            next.sizes = sizes;
        }
        if let Some(colors) = update.colors {
            next.colors = colors;
        }
        if let Some(stock) = update.stock {
            next.stock = stock;
        }
        if let Some(images) = update.images {
            next.images = images;
        }
        if let Some(is_active) = update.is_active {
            next.is_active = is_active;
        }

        next.validate()?;
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    fn validate(&self) -> Result<(), ProductError> {
        if self.name.is_empty() {
            return Err(ProductError::NameRequired);
        }
        if self.brand.is_empty() {
            return Err(ProductError::BrandRequired);
        }
        let description_len = self.description.chars().count();
        if description_len < MIN_DESCRIPTION_LEN {
            return Err(ProductError::DescriptionTooShort {
                min: MIN_DESCRIPTION_LEN,
                actual: description_len,
            });
        }
        if self.price.is_negative() {
            return Err(ProductError::NegativePrice);
        }
        if self.discount > MAX_DISCOUNT_PERCENT {
            return Err(ProductError::InvalidDiscount(self.discount));
        }

        let allowed = self.category.allowed_sizes();
        let invalid: Vec<String> = self
            .sizes
            .iter()
            .filter(|size| !allowed.contains(&size.as_str()))
            .cloned()
            .collect();
        if !invalid.is_empty() {
            return Err(ProductError::InvalidSizes {
                category: self.category,
                sizes: invalid,
            });
        }

        if self.images.is_empty() {
            return Err(ProductError::ImagesRequired);
        }
        Ok(())
    }

    /// Price after discount: `price × (1 − discount/100)`, rounded to the
    /// nearest minor unit.
    pub fn unit_price(&self) -> Money {
        self.price
            .percent(100 - u32::from(self.discount.min(MAX_DISCOUNT_PERCENT)))
    }

    /// First listed image, snapshotted into order lines.
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Checks that the product is purchasable with the given size and color.
    ///
    /// Empty strings count as "not given".
    pub fn validate_selection(
        &self,
        size: Option<&str>,
        color: Option<&str>,
    ) -> Result<(), StockError> {
        if !self.is_active {
            return Err(StockError::Inactive {
                product_id: self.id,
                name: self.name.clone(),
            });
        }

        match size.filter(|s| !s.is_empty()) {
            None if !self.sizes.is_empty() => {
                return Err(StockError::SizeRequired {
                    product_id: self.id,
                    name: self.name.clone(),
                });
            }
            Some(size) if !self.sizes.iter().any(|s| s == size) => {
                return Err(StockError::InvalidSize {
                    product_id: self.id,
                    name: self.name.clone(),
                    size: size.to_string(),
                });
            }
            _ => {}
        }

        if let Some(color) = color.filter(|c| !c.is_empty()) {
            if !self.colors.iter().any(|c| c == color) {
                return Err(StockError::InvalidColor {
                    product_id: self.id,
                    name: self.name.clone(),
                    color: color.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Checks that `quantity` units can be taken from current stock.
    pub fn ensure_available(&self, quantity: u32) -> Result<(), StockError> {
        if quantity > self.stock {
            return Err(self.insufficient(quantity));
        }
        Ok(())
    }

    /// Checks that `held + extra` units are in stock and returns the sum.
    /// A sum past `u32::MAX` can never be in stock.
    pub fn ensure_available_with(&self, held: u32, extra: u32) -> Result<u32, StockError> {
        let total = held
            .checked_add(extra)
            .ok_or_else(|| self.insufficient(u32::MAX))?;
        self.ensure_available(total)?;
        Ok(total)
    }

    fn insufficient(&self, requested: u32) -> StockError {
        StockError::InsufficientStock {
            product_id: self.id,
            name: self.name.clone(),
            requested,
            available: self.stock,
        }
    }
}
