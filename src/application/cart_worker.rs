//! Periodic cart aggregation.
//!
//! Each cycle makes sure the configured user has a cart, drains the catalog
//! and pushes every product into the cart service's merge upload. Pulling and
//! pushing overlap: the upload is drained by the cart service while the
//! catalog is still being read.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use log::{error, info};
use tokio::sync::watch;

use crate::domain::cart::{Cart, CartItem, MergeRequest, MergeSummary};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartGateway, CatalogSource};
use crate::domain::product::Product;

#[derive(Debug, Clone)]
pub struct CartWorkerSettings {
    pub username: String,
    pub discount_code: String,
    pub item_color: String,
    pub interval: Duration,
}

pub struct CartAggregationWorker {
    carts: Arc<dyn CartGateway>,
    catalog: Arc<dyn CatalogSource>,
    settings: CartWorkerSettings,
}

impl CartAggregationWorker {
    pub fn new(
        carts: Arc<dyn CartGateway>,
        catalog: Arc<dyn CatalogSource>,
        settings: CartWorkerSettings,
    ) -> Self {
        Self {
            carts,
            catalog,
            settings,
        }
    }

    /// Runs cycles until `shutdown` flips to `true` (or its sender goes away).
    /// A cycle in flight when shutdown arrives is dropped, which aborts both
    /// streams before anything is committed.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Cart worker started for {} every {:?}",
            self.settings.username, self.settings.interval
        );
        while !*shutdown.borrow() {
            info!("Cart worker running at: {}", Utc::now());

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                outcome = self.run_cycle() => match outcome {
                    Ok(summary) => info!(
                        "AddItemIntoShoppingCart response: success={} insert_count={}",
                        summary.success, summary.inserted_or_modified_count
                    ),
                    Err(e) => error!("Cart worker cycle aborted: {}", e),
                },
            }

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }
        info!("Cart worker stopped");
    }

    /// One full aggregation cycle.
    pub async fn run_cycle(&self) -> Result<MergeSummary, DomainError> {
        let cart = self.ensure_cart().await?;
        info!(
            "Cart of {} holds {} item(s) before merging",
            cart.username,
            cart.items.len()
        );

        let mut upload = self.carts.open_merge().await?;
        info!("GetAllProducts started...");
        let mut products = self.catalog.list_products().await?;

        let mut forwarded = 0usize;
        while let Some(product) = products.next().await {
            let request = self.merge_request(product?);
            upload.send(request).await?;
            forwarded += 1;
        }
        info!("Forwarded {} product(s) to the cart service", forwarded);

        upload.finish().await
    }

    async fn ensure_cart(&self) -> Result<Cart, DomainError> {
        let username = &self.settings.username;
        match self.carts.get_cart(username).await {
            Ok(cart) => Ok(cart),
            Err(DomainError::CartNotFound(_)) => {
                info!("No cart for {}; creating one", username);
                match self.carts.create_cart(Cart::empty(username.as_str())).await {
                    // Someone else created it in between.
                    Err(DomainError::CartAlreadyExists(_)) => self.carts.get_cart(username).await,
                    other => other,
                }
            }
            Err(e) => Err(e),
        }
    }

    fn merge_request(&self, product: Product) -> MergeRequest {
        MergeRequest {
            username: self.settings.username.clone(),
            discount_code: self.settings.discount_code.clone(),
            item: CartItem {
                product_id: product.id,
                product_name: product.name,
                quantity: 1,
                color: self.settings.item_color.clone(),
                price: product.price,
            },
        }
    }
}
