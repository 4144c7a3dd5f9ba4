use std::process;
use std::sync::Arc;

use dotenvy::dotenv;
use log::{error, info};
use shopping_cart::application::cart_worker::{CartAggregationWorker, CartWorkerSettings};
use shopping_cart::config::CartWorkerConfig;
use shopping_cart::infrastructure::http_client::{
    build_http_client, HttpCartClient, HttpCatalogClient,
};
use shopping_cart::shutdown;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = CartWorkerConfig::load().unwrap_or_else(|e| e.exit());
    let http = build_http_client().unwrap_or_else(|e| {
        error!("Failed to build HTTP client: {}", e);
        process::exit(1);
    });

    info!(
        "Cart worker talks to carts at {} and products at {}",
        config.cart_service_url, config.product_service_url
    );
    let interval = config.interval();
    let worker = CartAggregationWorker::new(
        Arc::new(HttpCartClient::new(http.clone(), config.cart_service_url)),
        Arc::new(HttpCatalogClient::new(http, config.product_service_url)),
        CartWorkerSettings {
            username: config.username,
            discount_code: config.discount_code,
            item_color: config.item_color,
            interval,
        },
    );

    let shutdown_rx = shutdown::spawn_listener();
    worker.run(shutdown_rx).await;
}
