use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::cart::CartItem;
use crate::schema::{cart_items, carts};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartRow {
    pub id: i32,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = carts)]
pub struct NewCartRow<'a> {
    pub username: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = cart_items)]
#[diesel(belongs_to(CartRow, foreign_key = cart_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemRow {
    pub id: i32,
    pub cart_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub color: String,
    pub price: BigDecimal,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        CartItem {
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            color: row.color,
            price: row.price,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cart_items)]
pub struct NewCartItemRow<'a> {
    pub cart_id: i32,
    pub product_id: i32,
    pub product_name: &'a str,
    pub quantity: i32,
    pub color: &'a str,
    pub price: &'a BigDecimal,
}

impl<'a> NewCartItemRow<'a> {
    pub fn for_cart(cart_id: i32, item: &'a CartItem) -> Self {
        Self {
            cart_id,
            product_id: item.product_id,
            product_name: &item.product_name,
            quantity: item.quantity,
            color: &item.color,
            price: &item.price,
        }
    }
}
