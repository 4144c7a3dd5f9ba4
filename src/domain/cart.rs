use std::collections::HashSet;

use bigdecimal::BigDecimal;

use super::errors::DomainError;

#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub color: String,
    /// Unit price after discount.
    pub price: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    pub username: String,
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn empty(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            items: Vec::new(),
        }
    }

    pub fn item(&self, product_id: i32) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    pub fn item_mut(&mut self, product_id: i32) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|i| i.product_id == product_id)
    }

    /// Checks the invariants a cart must satisfy before it is stored.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.username.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "username must not be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for item in &self.items {
            if item.quantity <= 0 {
                return Err(DomainError::InvalidInput(format!(
                    "quantity of product {} must be positive, got {}",
                    item.product_id, item.quantity
                )));
            }
            if !seen.insert(item.product_id) {
                return Err(DomainError::InvalidInput(format!(
                    "product {} appears more than once",
                    item.product_id
                )));
            }
        }
        Ok(())
    }
}

/// One element of a merge stream: fold `item` into `username`'s cart.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeRequest {
    pub username: String,
    pub discount_code: String,
    pub item: CartItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub success: bool,
    pub inserted_or_modified_count: usize,
}

impl MergeSummary {
    pub fn from_count(count: usize) -> Self {
        Self {
            success: count > 0,
            inserted_or_modified_count: count,
        }
    }
}

/// A single mutation produced by a merge batch, applied by the store at commit.
///
/// Both variants are relative to whatever the store holds at commit time, so
/// batches built from the same snapshot never overwrite each other.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemChange {
    /// Adds `item`; if the product is already stored, only its quantity grows
    /// by `item.quantity`.
    Insert { username: String, item: CartItem },
    Increment {
        username: String,
        product_id: i32,
        by: i32,
    },
}

impl ItemChange {
    pub fn username(&self) -> &str {
        match self {
            ItemChange::Insert { username, .. } | ItemChange::Increment { username, .. } => {
                username
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: i32, quantity: i32) -> CartItem {
        CartItem {
            product_id,
            product_name: format!("p{product_id}"),
            quantity,
            color: "Black".to_string(),
            price: BigDecimal::from(10),
        }
    }

    #[test]
    fn validate_accepts_empty_cart() {
        assert!(Cart::empty("swn").validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_username() {
        let err = Cart::empty("  ").validate().unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn validate_rejects_duplicate_products() {
        let cart = Cart {
            username: "swn".into(),
            items: vec![item(1, 1), item(1, 2)],
        };
        assert!(matches!(cart.validate(), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn validate_rejects_non_positive_quantity() {
        let cart = Cart {
            username: "swn".into(),
            items: vec![item(1, 0)],
        };
        assert!(matches!(cart.validate(), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn summary_success_follows_count() {
        assert_eq!(
            MergeSummary::from_count(0),
            MergeSummary {
                success: false,
                inserted_or_modified_count: 0
            }
        );
        assert!(MergeSummary::from_count(3).success);
    }
}
