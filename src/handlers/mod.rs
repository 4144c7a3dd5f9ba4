pub mod carts;
pub mod discounts;
pub mod products;

use actix_web::{error, web};

use crate::domain::errors::DomainError;
use crate::errors::AppError;

/// Malformed JSON bodies get the same `{kind, error}` shape as every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        error::InternalError::from_response(
            err,
            actix_web::ResponseError::error_response(&AppError::BadRequest(
                DomainError::InvalidInput(message),
            )),
        )
        .into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        error::InternalError::from_response(
            err,
            actix_web::ResponseError::error_response(&AppError::BadRequest(
                DomainError::InvalidInput(message),
            )),
        )
        .into()
    })
}
