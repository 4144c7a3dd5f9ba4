use std::sync::Arc;
use std::time::Duration;

use bigdecimal::BigDecimal;
use chrono::Utc;
use log::{error, info};
use tokio::sync::watch;

use crate::domain::errors::DomainError;
use crate::domain::ports::ProductGateway;
use crate::domain::product::{NewProduct, Product, ProductStatus};

/// Builds the products the worker submits.
#[derive(Debug, Clone)]
pub struct ProductFactory {
    name_prefix: String,
}

impl ProductFactory {
    pub fn new(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
        }
    }

    pub fn generate(&self) -> NewProduct {
        let now = Utc::now();
        NewProduct {
            name: format!("{} - {}", self.name_prefix, now.to_rfc3339()),
            description: "New Red Phone Mi10T".to_string(),
            price: BigDecimal::from(699),
            status: ProductStatus::InStock,
            created_at: now,
        }
    }
}

/// Periodically adds a generated product to the catalog.
pub struct ProductWorker {
    products: Arc<dyn ProductGateway>,
    factory: ProductFactory,
    interval: Duration,
}

impl ProductWorker {
    pub fn new(products: Arc<dyn ProductGateway>, factory: ProductFactory, interval: Duration) -> Self {
        Self {
            products,
            factory,
            interval,
        }
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        while !*shutdown.borrow() {
            info!("Product worker running at: {}", Utc::now());

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                outcome = self.run_cycle() => match outcome {
                    Ok(product) => info!("AddProduct response: {}_{}", product.id, product.name),
                    Err(e) => error!("Product worker cycle failed: {}", e),
                },
            }

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!("Product worker stopped");
    }

    pub async fn run_cycle(&self) -> Result<Product, DomainError> {
        info!("AddProduct started");
        self.products.add_product(self.factory.generate()).await
    }
}
