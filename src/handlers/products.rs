use actix_web::{web, HttpResponse};
use futures::StreamExt;
use utoipa::OpenApi;

use crate::application::product_service::ProductService;
use crate::contracts::{
    ErrorBody, InsertBulkResponse, ProductInput, ProductModel, ProductStatusModel, SuccessResponse,
};
use crate::domain::product::NewProduct;
use crate::errors::AppError;
use crate::ndjson;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        get_product,
        add_product,
        update_product,
        delete_product,
        insert_bulk
    ),
    components(schemas(
        ProductModel,
        ProductInput,
        ProductStatusModel,
        InsertBulkResponse,
        SuccessResponse,
        ErrorBody
    )),
    tags((name = "products", description = "Product catalog"))
)]
pub struct ProductApiDoc;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/products")
            .route("", web::get().to(list_products))
            .route("", web::post().to(add_product))
            .route("/bulk", web::post().to(insert_bulk))
            .route("/{id}", web::get().to(get_product))
            .route("/{id}", web::put().to(update_product))
            .route("/{id}", web::delete().to(delete_product)),
    );
}

/// GET /products
///
/// Streams the whole catalog as newline-delimited JSON, one product per line.
#[utoipa::path(
    get,
    path = "/products",
    responses(
        (status = 200, description = "Every product, one per line", body = ProductModel,
            content_type = "application/x-ndjson"),
    ),
    tag = "products"
)]
pub async fn list_products(service: web::Data<ProductService>) -> Result<HttpResponse, AppError> {
    let products = service.list_products().await?;
    let body = products.map(|product| product.and_then(|p| ndjson::encode(&ProductModel::from(&p))));
    Ok(HttpResponse::Ok()
        .content_type(ndjson::CONTENT_TYPE)
        .streaming(body))
}

/// GET /products/{id}
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product found", body = ProductModel),
        (status = 404, description = "Product not found", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn get_product(
    service: web::Data<ProductService>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let product = service.get_product(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ProductModel::from(&product)))
}

/// POST /products
#[utoipa::path(
    post,
    path = "/products",
    request_body = ProductInput,
    responses(
        (status = 201, description = "Product added", body = ProductModel),
        (status = 400, description = "Invalid product", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn add_product(
    service: web::Data<ProductService>,
    body: web::Json<ProductInput>,
) -> Result<HttpResponse, AppError> {
    let product = NewProduct::try_from(body.into_inner())?;
    let product = service.add_product(product).await?;
    Ok(HttpResponse::Created().json(ProductModel::from(&product)))
}

/// PUT /products/{id}
#[utoipa::path(
    put,
    path = "/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    request_body = ProductInput,
    responses(
        (status = 200, description = "Product updated", body = ProductModel),
        (status = 400, description = "Invalid product", body = ErrorBody),
        (status = 404, description = "Product not found", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn update_product(
    service: web::Data<ProductService>,
    path: web::Path<i32>,
    body: web::Json<ProductInput>,
) -> Result<HttpResponse, AppError> {
    let product = NewProduct::try_from(body.into_inner())?;
    let product = service.update_product(path.into_inner(), product).await?;
    Ok(HttpResponse::Ok().json(ProductModel::from(&product)))
}

/// DELETE /products/{id}
#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted", body = SuccessResponse),
        (status = 404, description = "Product not found", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn delete_product(
    service: web::Data<ProductService>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let success = service.delete_product(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(SuccessResponse { success }))
}

/// POST /products/bulk
///
/// Client-streamed insert, one `ProductInput` per line. All or nothing.
#[utoipa::path(
    post,
    path = "/products/bulk",
    request_body(
        content = ProductInput,
        content_type = "application/x-ndjson",
        description = "One product per line"
    ),
    responses(
        (status = 200, description = "Batch stored", body = InsertBulkResponse),
        (status = 400, description = "Malformed or invalid product", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn insert_bulk(
    service: web::Data<ProductService>,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    let products = ndjson::decode::<ProductInput, _, _>(payload)
        .map(|line| line.and_then(NewProduct::try_from));
    let count = service.insert_bulk(products).await?;
    Ok(HttpResponse::Ok().json(InsertBulkResponse::from_count(count)))
}
