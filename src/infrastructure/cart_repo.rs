use std::collections::HashMap;

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel::upsert::excluded;

use crate::db::DbPool;
use crate::domain::cart::{Cart, CartItem, ItemChange};
use crate::domain::errors::DomainError;
use crate::domain::ports::CartStore;
use crate::schema::{cart_items, carts};

use super::models::{CartItemRow, CartRow, NewCartItemRow, NewCartRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Persistence(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Persistence(e.to_string())
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// Postgres-backed cart store. Diesel is blocking, so every call runs on the
/// blocking pool with its own pooled connection.
pub struct DieselCartStore {
    pool: DbPool,
}

impl DieselCartStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, DomainError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| DomainError::Internal(format!("database task failed: {e}")))?
    }
}

fn find_cart(conn: &mut PgConnection, username: &str) -> Result<Option<CartRow>, DomainError> {
    Ok(carts::table
        .filter(carts::username.eq(username))
        .select(CartRow::as_select())
        .first(conn)
        .optional()?)
}

fn load_items(conn: &mut PgConnection, cart: &CartRow) -> Result<Vec<CartItem>, DomainError> {
    let rows = CartItemRow::belonging_to(cart)
        .select(CartItemRow::as_select())
        .order(cart_items::id.asc())
        .load(conn)?;
    Ok(rows.into_iter().map(CartItem::from).collect())
}

fn insert_items(conn: &mut PgConnection, cart_id: i32, items: &[CartItem]) -> Result<(), DomainError> {
    if items.is_empty() {
        return Ok(());
    }
    let rows: Vec<NewCartItemRow<'_>> = items
        .iter()
        .map(|item| NewCartItemRow::for_cart(cart_id, item))
        .collect();
    diesel::insert_into(cart_items::table)
        .values(&rows)
        .execute(conn)?;
    Ok(())
}

fn apply_change(
    conn: &mut PgConnection,
    cart_ids: &mut HashMap<String, i32>,
    change: &ItemChange,
) -> Result<(), DomainError> {
    let username = change.username();
    let cart_id = match cart_ids.get(username) {
        Some(id) => *id,
        None => {
            let cart = find_cart(conn, username)?.ok_or_else(|| {
                DomainError::Persistence(format!("cart of {username} disappeared before commit"))
            })?;
            cart_ids.insert(username.to_string(), cart.id);
            cart.id
        }
    };

    match change {
        // An item stored since the batch read the cart only gains quantity.
        ItemChange::Insert { item, .. } => {
            diesel::insert_into(cart_items::table)
                .values(&NewCartItemRow::for_cart(cart_id, item))
                .on_conflict((cart_items::cart_id, cart_items::product_id))
                .do_update()
                .set(cart_items::quantity.eq(cart_items::quantity + excluded(cart_items::quantity)))
                .execute(conn)?;
            Ok(())
        }
        ItemChange::Increment { product_id, by, .. } => {
            let updated = diesel::update(
                cart_items::table
                    .filter(cart_items::cart_id.eq(cart_id))
                    .filter(cart_items::product_id.eq(*product_id)),
            )
            .set(cart_items::quantity.eq(cart_items::quantity + *by))
            .execute(conn)?;
            if updated == 0 {
                return Err(DomainError::Persistence(format!(
                    "product {product_id} disappeared from the cart of {username} before commit"
                )));
            }
            Ok(())
        }
    }
}

#[async_trait]
impl CartStore for DieselCartStore {
    async fn get_cart(&self, username: &str) -> Result<Cart, DomainError> {
        let username = username.to_string();
        self.with_conn(move |conn| {
            let cart = find_cart(conn, &username)?
                .ok_or_else(|| DomainError::CartNotFound(username.clone()))?;
            let items = load_items(conn, &cart)?;
            Ok(Cart {
                username: cart.username,
                items,
            })
        })
        .await
    }

    async fn create_cart(&self, cart: Cart) -> Result<Cart, DomainError> {
        self.with_conn(move |conn| {
            conn.transaction::<_, DomainError, _>(|conn| {
                let row = diesel::insert_into(carts::table)
                    .values(&NewCartRow {
                        username: &cart.username,
                    })
                    .returning(CartRow::as_returning())
                    .get_result(conn)
                    .map_err(|e| match e {
                        diesel::result::Error::DatabaseError(
                            DatabaseErrorKind::UniqueViolation,
                            _,
                        ) => DomainError::CartAlreadyExists(cart.username.clone()),
                        other => DomainError::from(other),
                    })?;
                insert_items(conn, row.id, &cart.items)?;
                Ok(())
            })?;
            Ok(cart)
        })
        .await
    }

    async fn remove_item(&self, username: &str, product_id: i32) -> Result<bool, DomainError> {
        let username = username.to_string();
        self.with_conn(move |conn| {
            let cart = find_cart(conn, &username)?
                .ok_or_else(|| DomainError::CartNotFound(username.clone()))?;
            let deleted = diesel::delete(
                cart_items::table
                    .filter(cart_items::cart_id.eq(cart.id))
                    .filter(cart_items::product_id.eq(product_id)),
            )
            .execute(conn)?;
            if deleted == 0 {
                return Err(DomainError::ItemNotFound {
                    username,
                    product_id,
                });
            }
            Ok(true)
        })
        .await
    }

    async fn commit(&self, changes: Vec<ItemChange>) -> Result<usize, DomainError> {
        self.with_conn(move |conn| {
            conn.transaction::<_, DomainError, _>(|conn| {
                let mut cart_ids = HashMap::new();
                for change in &changes {
                    apply_change(conn, &mut cart_ids, change)?;
                }
                Ok(changes.len())
            })
        })
        .await
    }
}
