//! Shipping address snapshot.

use serde::{Deserialize, Serialize};

use super::OrderError;

pub const DEFAULT_COUNTRY: &str = "India";

/// Postal and contact details copied into the order at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

impl ShippingAddress {
    /// Trims every field and checks the required ones are present.
    pub fn normalize(self) -> Result<ShippingAddress, OrderError> {
        fn required(value: String, field: &'static str) -> Result<String, OrderError> {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(OrderError::InvalidAddress { field });
            }
            Ok(trimmed.to_string())
        }

        let country = match self.country.trim() {
            "" => default_country(),
            other => other.to_string(),
        };

        Ok(ShippingAddress {
            full_name: required(self.full_name, "fullName")?,
            phone: required(self.phone, "phone")?,
            email: required(self.email, "email")?,
            address_line1: required(self.address_line1, "addressLine1")?,
            address_line2: self
                .address_line2
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty()),
            city: required(self.city, "city")?,
            state: required(self.state, "state")?,
            pincode: required(self.pincode, "pincode")?,
            country,
        })
    }
}
