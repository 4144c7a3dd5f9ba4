pub mod application;
pub mod config;
pub mod contracts;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod ndjson;
pub mod schema;
pub mod shutdown;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::cart_service::CartService;
use application::discount_service::DiscountService;
use application::product_service::ProductService;
use domain::errors::DomainError;
use handlers::carts::CartApiDoc;
use handlers::discounts::DiscountApiDoc;
use handlers::products::ProductApiDoc;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const OPENAPI_URL: &str = "/api-docs/openapi.json";

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), DomainError> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| DomainError::Persistence(format!("failed to run migrations: {e}")))?;
    Ok(())
}

/// Build the cart service's `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server. The same holds for the other `build_*_server` functions.
pub fn build_cart_server(
    service: CartService,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let service = web::Data::new(service);
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .app_data(handlers::json_config())
            .app_data(handlers::path_config())
            .wrap(Logger::default())
            .configure(handlers::carts::configure)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url(OPENAPI_URL, CartApiDoc::openapi()))
    })
    .bind((host.to_string(), port))?
    .run())
}

pub fn build_discount_server(
    service: DiscountService,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let service = web::Data::new(service);
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .app_data(handlers::path_config())
            .wrap(Logger::default())
            .configure(handlers::discounts::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url(OPENAPI_URL, DiscountApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}

pub fn build_product_server(
    service: ProductService,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let service = web::Data::new(service);
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .app_data(handlers::json_config())
            .app_data(handlers::path_config())
            .wrap(Logger::default())
            .configure(handlers::products::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url(OPENAPI_URL, ProductApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
