//! Wire models shared by the HTTP handlers and the HTTP clients.
//!
//! Prices travel as decimal strings (e.g. `"599"` or `"9.99"`) to avoid
//! floating-point rounding.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::cart::{Cart, CartItem, MergeRequest, MergeSummary};
use crate::domain::discount::Discount;
use crate::domain::errors::DomainError;
use crate::domain::product::{NewProduct, Product, ProductStatus};

pub fn parse_price(raw: &str) -> Result<BigDecimal, DomainError> {
    BigDecimal::from_str(raw.trim())
        .map_err(|e| DomainError::InvalidInput(format!("invalid price '{raw}': {e}")))
}

// ── Carts ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartItemModel {
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub color: String,
    /// Unit price after discount, as a decimal string.
    pub price: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartModel {
    pub username: String,
    #[serde(default)]
    pub items: Vec<CartItemModel>,
}

impl From<&CartItem> for CartItemModel {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            color: item.color.clone(),
            price: item.price.to_string(),
        }
    }
}

impl TryFrom<CartItemModel> for CartItem {
    type Error = DomainError;

    fn try_from(model: CartItemModel) -> Result<Self, Self::Error> {
        Ok(CartItem {
            price: parse_price(&model.price)?,
            product_id: model.product_id,
            product_name: model.product_name,
            quantity: model.quantity,
            color: model.color,
        })
    }
}

impl From<&Cart> for CartModel {
    fn from(cart: &Cart) -> Self {
        Self {
            username: cart.username.clone(),
            items: cart.items.iter().map(CartItemModel::from).collect(),
        }
    }
}

impl TryFrom<CartModel> for Cart {
    type Error = DomainError;

    fn try_from(model: CartModel) -> Result<Self, Self::Error> {
        Ok(Cart {
            username: model.username,
            items: model
                .items
                .into_iter()
                .map(CartItem::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

/// One line of a `POST /carts/items` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MergeItemRequest {
    pub username: String,
    pub discount_code: String,
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub color: String,
    /// Undiscounted unit price, as a decimal string.
    pub price: String,
}

impl From<&MergeRequest> for MergeItemRequest {
    fn from(request: &MergeRequest) -> Self {
        Self {
            username: request.username.clone(),
            discount_code: request.discount_code.clone(),
            product_id: request.item.product_id,
            product_name: request.item.product_name.clone(),
            quantity: request.item.quantity,
            color: request.item.color.clone(),
            price: request.item.price.to_string(),
        }
    }
}

impl TryFrom<MergeItemRequest> for MergeRequest {
    type Error = DomainError;

    fn try_from(model: MergeItemRequest) -> Result<Self, Self::Error> {
        Ok(MergeRequest {
            item: CartItem {
                price: parse_price(&model.price)?,
                product_id: model.product_id,
                product_name: model.product_name,
                quantity: model.quantity,
                color: model.color,
            },
            username: model.username,
            discount_code: model.discount_code,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MergeSummaryResponse {
    pub success: bool,
    pub insert_count: usize,
}

impl From<MergeSummary> for MergeSummaryResponse {
    fn from(summary: MergeSummary) -> Self {
        Self {
            success: summary.success,
            insert_count: summary.inserted_or_modified_count,
        }
    }
}

impl From<MergeSummaryResponse> for MergeSummary {
    fn from(response: MergeSummaryResponse) -> Self {
        Self {
            success: response.success,
            inserted_or_modified_count: response.insert_count,
        }
    }
}

/// Result of `POST /products/bulk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InsertBulkResponse {
    pub success: bool,
    pub insert_count: usize,
}

impl InsertBulkResponse {
    pub fn from_count(count: usize) -> Self {
        Self {
            success: count > 0,
            insert_count: count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

// ── Discounts ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiscountModel {
    pub id: i32,
    pub code: String,
    /// Amount subtracted from the unit price, as a decimal string.
    pub amount: String,
}

impl From<&Discount> for DiscountModel {
    fn from(discount: &Discount) -> Self {
        Self {
            id: discount.id,
            code: discount.code.clone(),
            amount: discount.amount.to_string(),
        }
    }
}

impl TryFrom<DiscountModel> for Discount {
    type Error = DomainError;

    fn try_from(model: DiscountModel) -> Result<Self, Self::Error> {
        Ok(Discount {
            amount: parse_price(&model.amount)?,
            id: model.id,
            code: model.code,
        })
    }
}

// ── Products ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatusModel {
    InStock,
    Low,
    None,
}

impl From<ProductStatus> for ProductStatusModel {
    fn from(status: ProductStatus) -> Self {
        match status {
            ProductStatus::InStock => ProductStatusModel::InStock,
            ProductStatus::Low => ProductStatusModel::Low,
            ProductStatus::None => ProductStatusModel::None,
        }
    }
}

impl From<ProductStatusModel> for ProductStatus {
    fn from(status: ProductStatusModel) -> Self {
        match status {
            ProductStatusModel::InStock => ProductStatus::InStock,
            ProductStatusModel::Low => ProductStatus::Low,
            ProductStatusModel::None => ProductStatus::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductModel {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: String,
    pub status: ProductStatusModel,
    pub created_at: DateTime<Utc>,
}

impl From<&Product> for ProductModel {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            status: product.status.into(),
            created_at: product.created_at,
        }
    }
}

impl TryFrom<ProductModel> for Product {
    type Error = DomainError;

    fn try_from(model: ProductModel) -> Result<Self, Self::Error> {
        Ok(Product {
            price: parse_price(&model.price)?,
            id: model.id,
            name: model.name,
            description: model.description,
            status: model.status.into(),
            created_at: model.created_at,
        })
    }
}

/// Body of `POST /products`, `PUT /products/{id}` and each line of
/// `POST /products/bulk`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    pub status: ProductStatusModel,
    /// Defaults to the time the request is handled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&NewProduct> for ProductInput {
    fn from(product: &NewProduct) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            status: product.status.into(),
            created_at: Some(product.created_at),
        }
    }
}

impl TryFrom<ProductInput> for NewProduct {
    type Error = DomainError;

    fn try_from(input: ProductInput) -> Result<Self, Self::Error> {
        Ok(NewProduct {
            price: parse_price(&input.price)?,
            name: input.name,
            description: input.description,
            status: input.status.into(),
            created_at: input.created_at.unwrap_or_else(Utc::now),
        })
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Body of every error response. The optional fields identify the entity a
/// not-found or conflict error is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub kind: String,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i32>,
}

impl ErrorBody {
    pub fn new(kind: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            error: error.into(),
            username: None,
            code: None,
            product_id: None,
        }
    }

    /// Rebuilds the typed error a remote service reported.
    pub fn into_domain_error(self) -> DomainError {
        let ErrorBody {
            kind,
            error,
            username,
            code,
            product_id,
        } = self;
        match kind.as_str() {
            "CartNotFound" => DomainError::CartNotFound(username.unwrap_or_default()),
            "CartAlreadyExists" => DomainError::CartAlreadyExists(username.unwrap_or_default()),
            "ItemNotFound" => DomainError::ItemNotFound {
                username: username.unwrap_or_default(),
                product_id: product_id.unwrap_or_default(),
            },
            "DiscountNotFound" => DomainError::DiscountNotFound(code.unwrap_or_default()),
            "ProductNotFound" => DomainError::ProductNotFound(product_id.unwrap_or_default()),
            "InvalidInput" => DomainError::InvalidInput(error),
            "Transport" => DomainError::Transport(error),
            "Persistence" => DomainError::Persistence(error),
            "Internal" => DomainError::Internal(error),
            _ => DomainError::Rejected {
                kind,
                message: error,
            },
        }
    }
}

impl From<&DomainError> for ErrorBody {
    fn from(err: &DomainError) -> Self {
        let mut body = ErrorBody::new(err.kind(), err.to_string());
        match err {
            DomainError::CartNotFound(username) | DomainError::CartAlreadyExists(username) => {
                body.username = Some(username.clone());
            }
            DomainError::ItemNotFound {
                username,
                product_id,
            } => {
                body.username = Some(username.clone());
                body.product_id = Some(*product_id);
            }
            DomainError::DiscountNotFound(code) => body.code = Some(code.clone()),
            DomainError::ProductNotFound(id) => body.product_id = Some(*id),
            DomainError::InvalidInput(message)
            | DomainError::Transport(message)
            | DomainError::Persistence(message)
            | DomainError::Internal(message)
            | DomainError::Rejected { message, .. } => body.error = message.clone(),
        }
        body
    }
}
