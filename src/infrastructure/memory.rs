//! In-memory adapters.
//!
//! These back the services when no database is configured and seed the same
//! sample data the services ship with: the `swn` cart, three phones in the
//! catalog and the `CODE_100`..`CODE_300` discounts.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::cart::{Cart, CartItem, ItemChange};
use crate::domain::discount::Discount;
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartStore, DiscountLookup, ProductRepository};
use crate::domain::product::{NewProduct, Product, ProductStatus};

// ── Carts ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    carts: RwLock<HashMap<String, Cart>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded() -> Self {
        let cart = Cart {
            username: "swn".to_string(),
            items: vec![
                CartItem {
                    product_id: 1,
                    product_name: "Mi10T".to_string(),
                    quantity: 2,
                    color: "Black".to_string(),
                    price: BigDecimal::from(699),
                },
                CartItem {
                    product_id: 2,
                    product_name: "P40".to_string(),
                    quantity: 3,
                    color: "Red".to_string(),
                    price: BigDecimal::from(899),
                },
            ],
        };
        Self {
            carts: RwLock::new(HashMap::from([(cart.username.clone(), cart)])),
        }
    }
}

fn apply_change(carts: &mut HashMap<String, Cart>, change: ItemChange) -> Result<(), DomainError> {
    let cart = carts.get_mut(change.username()).ok_or_else(|| {
        DomainError::Persistence(format!(
            "cart of {} disappeared before commit",
            change.username()
        ))
    })?;
    match change {
        ItemChange::Insert { username, item } => match cart.item_mut(item.product_id) {
            Some(stored) => add_quantity(stored, item.quantity, &username)?,
            None => cart.items.push(item),
        },
        ItemChange::Increment {
            username,
            product_id,
            by,
        } => {
            let item = cart.item_mut(product_id).ok_or_else(|| {
                DomainError::Persistence(format!(
                    "product {product_id} disappeared from the cart of {username} before commit"
                ))
            })?;
            add_quantity(item, by, &username)?;
        }
    }
    Ok(())
}

fn add_quantity(item: &mut CartItem, by: i32, username: &str) -> Result<(), DomainError> {
    item.quantity = item.quantity.checked_add(by).ok_or_else(|| {
        DomainError::Persistence(format!(
            "quantity of product {} in the cart of {username} overflows",
            item.product_id
        ))
    })?;
    Ok(())
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn get_cart(&self, username: &str) -> Result<Cart, DomainError> {
        self.carts
            .read()
            .await
            .get(username)
            .cloned()
            .ok_or_else(|| DomainError::CartNotFound(username.to_string()))
    }

    async fn create_cart(&self, cart: Cart) -> Result<Cart, DomainError> {
        let mut carts = self.carts.write().await;
        if carts.contains_key(&cart.username) {
            return Err(DomainError::CartAlreadyExists(cart.username));
        }
        carts.insert(cart.username.clone(), cart.clone());
        Ok(cart)
    }

    async fn remove_item(&self, username: &str, product_id: i32) -> Result<bool, DomainError> {
        let mut carts = self.carts.write().await;
        let cart = carts
            .get_mut(username)
            .ok_or_else(|| DomainError::CartNotFound(username.to_string()))?;
        let position = cart
            .items
            .iter()
            .position(|i| i.product_id == product_id)
            .ok_or_else(|| DomainError::ItemNotFound {
                username: username.to_string(),
                product_id,
            })?;
        cart.items.remove(position);
        Ok(true)
    }

    async fn commit(&self, changes: Vec<ItemChange>) -> Result<usize, DomainError> {
        let mut carts = self.carts.write().await;

        // Stage on copies of the affected carts so a failing change leaves
        // the stored carts untouched.
        let mut staged: HashMap<String, Cart> = HashMap::new();
        for change in &changes {
            let username = change.username();
            if !staged.contains_key(username) {
                if let Some(cart) = carts.get(username) {
                    staged.insert(username.to_string(), cart.clone());
                }
            }
        }

        let applied = changes.len();
        for change in changes {
            apply_change(&mut staged, change)?;
        }
        carts.extend(staged);
        Ok(applied)
    }
}

// ── Discounts ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryDiscountTable {
    discounts: HashMap<String, Discount>,
}

impl InMemoryDiscountTable {
    pub fn new(discounts: impl IntoIterator<Item = Discount>) -> Self {
        Self {
            discounts: discounts
                .into_iter()
                .map(|d| (d.code.clone(), d))
                .collect(),
        }
    }

    pub fn seeded() -> Self {
        Self::new((1..=3).map(|n| Discount {
            id: n,
            code: format!("CODE_{}", n * 100),
            amount: BigDecimal::from(n * 100),
        }))
    }
}

#[async_trait]
impl DiscountLookup for InMemoryDiscountTable {
    async fn get_discount(&self, code: &str) -> Result<Discount, DomainError> {
        if code.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "discount code must not be empty".to_string(),
            ));
        }
        self.discounts
            .get(code)
            .cloned()
            .ok_or_else(|| DomainError::DiscountNotFound(code.to_string()))
    }
}

// ── Products ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ProductTable {
    last_id: i32,
    rows: BTreeMap<i32, Product>,
}

impl ProductTable {
    fn push(&mut self, product: NewProduct) -> Product {
        self.last_id += 1;
        let product = product.with_id(self.last_id);
        self.rows.insert(product.id, product.clone());
        product
    }
}

#[derive(Debug, Default)]
pub struct InMemoryProductRepository {
    table: RwLock<ProductTable>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded() -> Self {
        let mut table = ProductTable::default();
        for (name, description, price) in [
            ("Mi10T", "New Xiaomi Phone Mi10T", 699),
            ("P40", "New Huawei Phone P40", 899),
            ("A50", "New Samsung Phone A50", 399),
        ] {
            table.push(NewProduct {
                name: name.to_string(),
                description: description.to_string(),
                price: BigDecimal::from(price),
                status: ProductStatus::InStock,
                created_at: Utc::now(),
            });
        }
        Self {
            table: RwLock::new(table),
        }
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find(&self, id: i32) -> Result<Option<Product>, DomainError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn all(&self) -> Result<Vec<Product>, DomainError> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn insert(&self, product: NewProduct) -> Result<Product, DomainError> {
        Ok(self.table.write().await.push(product))
    }

    async fn insert_many(&self, products: Vec<NewProduct>) -> Result<usize, DomainError> {
        let mut table = self.table.write().await;
        let count = products.len();
        for product in products {
            table.push(product);
        }
        Ok(count)
    }

    async fn update(&self, product: Product) -> Result<Option<Product>, DomainError> {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&product.id) {
            Some(row) => {
                *row = product.clone();
                Ok(Some(product))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: i32) -> Result<bool, DomainError> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }
}
