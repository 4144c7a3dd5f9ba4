use std::sync::Arc;

use dotenvy::dotenv;
use log::info;
use shopping_cart::application::discount_service::DiscountService;
use shopping_cart::build_discount_server;
use shopping_cart::config::DiscountServiceConfig;
use shopping_cart::infrastructure::memory::InMemoryDiscountTable;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = DiscountServiceConfig::load().unwrap_or_else(|e| e.exit());

    let service = DiscountService::new(Arc::new(InMemoryDiscountTable::seeded()));
    info!("Starting discount service at http://{}:{}", config.host, config.port);

    build_discount_server(service, &config.host, config.port)?.await
}
