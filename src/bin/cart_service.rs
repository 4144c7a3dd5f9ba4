use std::process;
use std::sync::Arc;

use dotenvy::dotenv;
use log::{error, info};
use shopping_cart::application::cart_service::CartService;
use shopping_cart::build_cart_server;
use shopping_cart::config::CartServiceConfig;
use shopping_cart::domain::ports::CartStore;
use shopping_cart::infrastructure::cart_repo::DieselCartStore;
use shopping_cart::infrastructure::http_client::{build_http_client, HttpDiscountClient};
use shopping_cart::infrastructure::memory::InMemoryCartStore;
use shopping_cart::{create_pool, run_migrations};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = CartServiceConfig::load().unwrap_or_else(|e| e.exit());

    let store: Arc<dyn CartStore> = match config.database_url() {
        Some(database_url) => {
            let pool = create_pool(database_url).unwrap_or_else(|e| {
                error!("Failed to create database connection pool: {}", e);
                process::exit(1);
            });
            if let Err(e) = run_migrations(&pool) {
                error!("{}", e);
                process::exit(1);
            }
            info!("Carts are stored in PostgreSQL");
            Arc::new(DieselCartStore::new(pool))
        }
        None => {
            info!("DATABASE_URL not set; carts are kept in memory");
            Arc::new(InMemoryCartStore::seeded())
        }
    };

    let http = build_http_client().unwrap_or_else(|e| {
        error!("Failed to build HTTP client: {}", e);
        process::exit(1);
    });
    info!("Discounts are looked up at {}", config.discount_url);
    let discounts = Arc::new(HttpDiscountClient::new(http, config.discount_url.clone()));

    let service = CartService::new(store, discounts);
    info!("Starting cart service at http://{}:{}", config.host, config.port);

    build_cart_server(service, &config.host, config.port)?.await
}
