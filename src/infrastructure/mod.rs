pub mod cart_repo;
pub mod http_client;
pub mod memory;
pub mod models;
