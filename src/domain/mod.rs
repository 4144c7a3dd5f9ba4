pub mod cart;
pub mod discount;
pub mod errors;
pub mod ports;
pub mod product;
pub mod upload;
