use std::process;
use std::sync::Arc;

use dotenvy::dotenv;
use log::{error, info};
use shopping_cart::application::product_worker::{ProductFactory, ProductWorker};
use shopping_cart::config::ProductWorkerConfig;
use shopping_cart::infrastructure::http_client::{build_http_client, HttpProductClient};
use shopping_cart::shutdown;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = ProductWorkerConfig::load().unwrap_or_else(|e| e.exit());
    let http = build_http_client().unwrap_or_else(|e| {
        error!("Failed to build HTTP client: {}", e);
        process::exit(1);
    });

    info!("Product worker adds products at {}", config.product_service_url);
    let interval = config.interval();
    let worker = ProductWorker::new(
        Arc::new(HttpProductClient::new(http, config.product_service_url)),
        ProductFactory::new(config.product_name),
        interval,
    );

    let shutdown_rx = shutdown::spawn_listener();
    worker.run(shutdown_rx).await;
}
