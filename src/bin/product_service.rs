use std::sync::Arc;

use dotenvy::dotenv;
use log::info;
use shopping_cart::application::product_service::ProductService;
use shopping_cart::build_product_server;
use shopping_cart::config::ProductServiceConfig;
use shopping_cart::infrastructure::memory::InMemoryProductRepository;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = ProductServiceConfig::load().unwrap_or_else(|e| e.exit());

    let service = ProductService::new(Arc::new(InMemoryProductRepository::seeded()));
    info!("Starting product service at http://{}:{}", config.host, config.port);

    build_product_server(service, &config.host, config.port)?.await
}
