use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, Stream, StreamExt, TryStreamExt};
use log::info;

use crate::domain::errors::DomainError;
use crate::domain::ports::{CatalogSource, ProductGateway, ProductRepository, ProductStream};
use crate::domain::product::{NewProduct, Product};

#[derive(Clone)]
pub struct ProductService {
    repo: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_product(&self, id: i32) -> Result<Product, DomainError> {
        self.repo
            .find(id)
            .await?
            .ok_or(DomainError::ProductNotFound(id))
    }

    /// Streams a snapshot of the catalog taken when the call is made.
    pub async fn list_products(&self) -> Result<ProductStream, DomainError> {
        let products = self.repo.all().await?;
        Ok(stream::iter(products.into_iter().map(Ok)).boxed())
    }

    pub async fn add_product(&self, product: NewProduct) -> Result<Product, DomainError> {
        product.validate()?;
        let product = self.repo.insert(product).await?;
        info!(
            "Product successfully added: {}_{}",
            product.id, product.name
        );
        Ok(product)
    }

    pub async fn update_product(&self, id: i32, product: NewProduct) -> Result<Product, DomainError> {
        product.validate()?;
        self.repo
            .update(product.with_id(id))
            .await?
            .ok_or(DomainError::ProductNotFound(id))
    }

    pub async fn delete_product(&self, id: i32) -> Result<bool, DomainError> {
        if !self.repo.delete(id).await? {
            return Err(DomainError::ProductNotFound(id));
        }
        info!("Product {} deleted", id);
        Ok(true)
    }

    /// Drains a client-streamed batch and inserts it in one go. A broken or
    /// invalid element rejects the whole batch.
    pub async fn insert_bulk<S>(&self, products: S) -> Result<usize, DomainError>
    where
        S: Stream<Item = Result<NewProduct, DomainError>>,
    {
        let batch: Vec<NewProduct> = products
            .and_then(|p| async move { p.validate().map(|_| p) })
            .try_collect()
            .await?;
        if batch.is_empty() {
            return Ok(0);
        }
        let count = self.repo.insert_many(batch).await?;
        info!("Bulk insert stored {} product(s)", count);
        Ok(count)
    }
}

#[async_trait]
impl CatalogSource for ProductService {
    async fn list_products(&self) -> Result<ProductStream, DomainError> {
        ProductService::list_products(self).await
    }
}

#[async_trait]
impl ProductGateway for ProductService {
    async fn add_product(&self, product: NewProduct) -> Result<Product, DomainError> {
        ProductService::add_product(self, product).await
    }
}
