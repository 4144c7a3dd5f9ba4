//! Service and worker configuration.
//!
//! Every setting comes from a command-line flag or its environment variable
//! (optionally loaded from `.env`), with the defaults below.

use std::time::Duration;

use clap::Parser;
use reqwest::Url;

fn non_empty(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err("must not be empty".to_string());
    }
    Ok(value.to_string())
}

/// Cart service configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "cart-service", about = "Shopping cart service", long_about = None)]
pub struct CartServiceConfig {
    /// Server host address
    #[arg(short = 'H', long, env = "HOST", default_value = "0.0.0.0", value_parser = non_empty)]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "PORT", default_value = "5002")]
    pub port: u16,

    /// `PostgreSQL` connection string; carts are kept in memory when unset
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Base URL of the discount service
    #[arg(long, env = "DISCOUNT_URL", default_value = "http://localhost:5003")]
    pub discount_url: Url,
}

impl CartServiceConfig {
    pub fn load() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    /// The database URL, or `None` when unset or blank.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }
}

/// Discount service configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "discount-service", about = "Discount lookup service", long_about = None)]
pub struct DiscountServiceConfig {
    /// Server host address
    #[arg(short = 'H', long, env = "HOST", default_value = "0.0.0.0", value_parser = non_empty)]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "PORT", default_value = "5003")]
    pub port: u16,
}

impl DiscountServiceConfig {
    pub fn load() -> Result<Self, clap::Error> {
        Self::try_parse()
    }
}

/// Product service configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "product-service", about = "Product catalog service", long_about = None)]
pub struct ProductServiceConfig {
    /// Server host address
    #[arg(short = 'H', long, env = "HOST", default_value = "0.0.0.0", value_parser = non_empty)]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "PORT", default_value = "5001")]
    pub port: u16,
}

impl ProductServiceConfig {
    pub fn load() -> Result<Self, clap::Error> {
        Self::try_parse()
    }
}

/// Cart aggregation worker configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "cart-worker", about = "Periodically merges the catalog into a cart", long_about = None)]
pub struct CartWorkerConfig {
    /// Base URL of the cart service
    #[arg(long, env = "WORKER_SHOPPING_CART_SERVER_URL", default_value = "http://localhost:5002")]
    pub cart_service_url: Url,

    /// Base URL of the product service
    #[arg(long, env = "WORKER_PRODUCT_SERVER_URL", default_value = "http://localhost:5001")]
    pub product_service_url: Url,

    /// Owner of the cart the catalog is merged into
    #[arg(long, env = "WORKER_USERNAME", default_value = "swn", value_parser = non_empty)]
    pub username: String,

    /// Discount code applied to newly inserted items
    #[arg(long, env = "WORKER_DISCOUNT_CODE", default_value = "CODE_100", value_parser = non_empty)]
    pub discount_code: String,

    /// Color given to every merged item
    #[arg(long, env = "WORKER_ITEM_COLOR", default_value = "Black", value_parser = non_empty)]
    pub item_color: String,

    /// Pause between cycles, in milliseconds
    #[arg(
        long = "interval-ms",
        env = "WORKER_TASK_INTERVAL_MS",
        default_value = "20000",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_ms: u64,
}

impl CartWorkerConfig {
    pub fn load() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Product generation worker configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "product-worker", about = "Periodically adds generated products", long_about = None)]
pub struct ProductWorkerConfig {
    /// Base URL of the product service
    #[arg(long, env = "WORKER_PRODUCT_SERVER_URL", default_value = "http://localhost:5001")]
    pub product_service_url: Url,

    /// Name prefix of generated products
    #[arg(long, env = "WORKER_PRODUCT_NAME", default_value = "Product", value_parser = non_empty)]
    pub product_name: String,

    /// Pause between cycles, in milliseconds
    #[arg(
        long = "interval-ms",
        env = "WORKER_TASK_INTERVAL_MS",
        default_value = "20000",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_ms: u64,
}

impl ProductWorkerConfig {
    pub fn load() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
