use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductStatus {
    InStock,
    Low,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
}

/// A product before the catalog has assigned it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "product name must not be empty".to_string(),
            ));
        }
        if self.price < BigDecimal::zero() {
            return Err(DomainError::InvalidInput(format!(
                "price of {} must not be negative",
                self.name
            )));
        }
        Ok(())
    }

    pub fn with_id(self, id: i32) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            status: self.status,
            created_at: self.created_at,
        }
    }
}
