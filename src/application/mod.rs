pub mod cart_merge;
pub mod cart_service;
pub mod cart_worker;
pub mod discount_service;
pub mod product_service;
pub mod product_worker;
