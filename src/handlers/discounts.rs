use actix_web::{web, HttpResponse};
use utoipa::OpenApi;

use crate::application::discount_service::DiscountService;
use crate::contracts::{DiscountModel, ErrorBody};
use crate::errors::AppError;

#[derive(OpenApi)]
#[openapi(
    paths(get_discount),
    components(schemas(DiscountModel, ErrorBody)),
    tags((name = "discounts", description = "Discount code lookup"))
)]
pub struct DiscountApiDoc;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/discounts/{code}", web::get().to(get_discount));
}

/// GET /discounts/{code}
#[utoipa::path(
    get,
    path = "/discounts/{code}",
    params(
        ("code" = String, Path, description = "Discount code, e.g. CODE_100"),
    ),
    responses(
        (status = 200, description = "Discount found", body = DiscountModel),
        (status = 404, description = "Unknown discount code", body = ErrorBody),
    ),
    tag = "discounts"
)]
pub async fn get_discount(
    service: web::Data<DiscountService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let discount = service.get_discount(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(DiscountModel::from(&discount)))
}
