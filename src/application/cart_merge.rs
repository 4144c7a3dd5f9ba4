//! Working set of a single merge stream.
//!
//! Carts named by the stream are loaded once and mutated in memory; nothing
//! reaches the store until the batch is turned into [`ItemChange`]s at the
//! end of the stream.

use std::collections::{HashMap, HashSet};

use crate::domain::cart::{Cart, CartItem, ItemChange};
use crate::domain::errors::DomainError;

type ItemKey = (String, i32);

#[derive(Debug, Default)]
pub struct MergeBatch {
    carts: HashMap<String, Cart>,
    /// Items in the order they were first touched.
    touched: Vec<ItemKey>,
    seen: HashSet<ItemKey>,
    inserted: HashSet<ItemKey>,
    /// Units added to items that were already stored.
    increments: HashMap<ItemKey, i32>,
}

impl MergeBatch {
    pub fn track(&mut self, cart: Cart) {
        self.carts.entry(cart.username.clone()).or_insert(cart);
    }

    /// Bumps the quantity of `product_id` by one if the cart already holds it.
    /// Returns the new quantity, or `None` when the product is new to the cart.
    pub fn increment(&mut self, username: &str, product_id: i32) -> Result<Option<i32>, DomainError> {
        let cart = self.cart_mut(username)?;
        let Some(item) = cart.item_mut(product_id) else {
            return Ok(None);
        };
        item.quantity = item.quantity.checked_add(1).ok_or_else(|| {
            DomainError::InvalidInput(format!(
                "quantity of product {product_id} in the cart of {username} overflows"
            ))
        })?;
        let quantity = item.quantity;
        let key = (username.to_string(), product_id);
        if !self.inserted.contains(&key) {
            *self.increments.entry(key).or_insert(0) += 1;
        }
        self.touch(username, product_id);
        Ok(Some(quantity))
    }

    pub fn insert(&mut self, username: &str, item: CartItem) -> Result<(), DomainError> {
        let product_id = item.product_id;
        let cart = self.cart_mut(username)?;
        if cart.item(product_id).is_some() {
            return Err(DomainError::Internal(format!(
                "product {product_id} inserted twice into the cart of {username}"
            )));
        }
        cart.items.push(item);
        self.inserted.insert((username.to_string(), product_id));
        self.touch(username, product_id);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.touched.is_empty()
    }

    pub fn into_changes(self) -> Vec<ItemChange> {
        let Self {
            carts,
            touched,
            inserted,
            increments,
            ..
        } = self;
        touched
            .into_iter()
            .filter_map(|key| {
                let item = carts.get(&key.0)?.item(key.1)?;
                let change = if inserted.contains(&key) {
                    ItemChange::Insert {
                        username: key.0,
                        item: item.clone(),
                    }
                } else {
                    ItemChange::Increment {
                        by: *increments.get(&key)?,
                        username: key.0,
                        product_id: key.1,
                    }
                };
                Some(change)
            })
            .collect()
    }

    fn cart_mut(&mut self, username: &str) -> Result<&mut Cart, DomainError> {
        self.carts.get_mut(username).ok_or_else(|| {
            DomainError::Internal(format!("cart of {username} is not loaded in the merge batch"))
        })
    }

    fn touch(&mut self, username: &str, product_id: i32) {
        let key = (username.to_string(), product_id);
        if self.seen.insert(key.clone()) {
            self.touched.push(key);
        }
    }
}
