use async_trait::async_trait;
use futures::stream::BoxStream;

use super::cart::{Cart, ItemChange};
use super::discount::Discount;
use super::errors::DomainError;
use super::product::{NewProduct, Product};
use super::upload::MergeUpload;

pub type ProductStream = BoxStream<'static, Result<Product, DomainError>>;

/// Storage for carts, keyed by username.
#[async_trait]
pub trait CartStore: Send + Sync + 'static {
    async fn get_cart(&self, username: &str) -> Result<Cart, DomainError>;
    async fn create_cart(&self, cart: Cart) -> Result<Cart, DomainError>;
    async fn remove_item(&self, username: &str, product_id: i32) -> Result<bool, DomainError>;
    /// Applies every change or none of them. Returns the number of changes applied.
    async fn commit(&self, changes: Vec<ItemChange>) -> Result<usize, DomainError>;
}

#[async_trait]
pub trait DiscountLookup: Send + Sync + 'static {
    async fn get_discount(&self, code: &str) -> Result<Discount, DomainError>;
}

#[async_trait]
pub trait CatalogSource: Send + Sync + 'static {
    /// Opens a fresh, finite stream over every product in the catalog.
    async fn list_products(&self) -> Result<ProductStream, DomainError>;
}

/// Persistence behind the product service.
#[async_trait]
pub trait ProductRepository: Send + Sync + 'static {
    async fn find(&self, id: i32) -> Result<Option<Product>, DomainError>;
    async fn all(&self) -> Result<Vec<Product>, DomainError>;
    async fn insert(&self, product: NewProduct) -> Result<Product, DomainError>;
    /// All-or-nothing insert of a batch. Returns the number of rows inserted.
    async fn insert_many(&self, products: Vec<NewProduct>) -> Result<usize, DomainError>;
    async fn update(&self, product: Product) -> Result<Option<Product>, DomainError>;
    async fn delete(&self, id: i32) -> Result<bool, DomainError>;
}

/// The cart service as seen by the aggregation worker.
#[async_trait]
pub trait CartGateway: Send + Sync + 'static {
    async fn get_cart(&self, username: &str) -> Result<Cart, DomainError>;
    async fn create_cart(&self, cart: Cart) -> Result<Cart, DomainError>;
    async fn open_merge(&self) -> Result<MergeUpload, DomainError>;
}

/// The product service as seen by the product generation worker.
#[async_trait]
pub trait ProductGateway: Send + Sync + 'static {
    async fn add_product(&self, product: NewProduct) -> Result<Product, DomainError>;
}
