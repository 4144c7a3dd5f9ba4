use actix_web::{web, HttpResponse};
use futures::StreamExt;
use utoipa::OpenApi;

use crate::application::cart_service::CartService;
use crate::contracts::{
    CartItemModel, CartModel, ErrorBody, MergeItemRequest, MergeSummaryResponse, SuccessResponse,
};
use crate::domain::cart::{Cart, MergeRequest};
use crate::errors::AppError;
use crate::ndjson;

#[derive(OpenApi)]
#[openapi(
    paths(get_cart, create_cart, remove_item, merge_items),
    components(schemas(
        CartModel,
        CartItemModel,
        MergeItemRequest,
        MergeSummaryResponse,
        SuccessResponse,
        ErrorBody
    )),
    tags((name = "carts", description = "Shopping carts"))
)]
pub struct CartApiDoc;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/carts")
            .route("", web::post().to(create_cart))
            .route("/items", web::post().to(merge_items))
            .route("/{username}", web::get().to(get_cart))
            .route(
                "/{username}/items/{product_id}",
                web::delete().to(remove_item),
            ),
    );
}

/// GET /carts/{username}
#[utoipa::path(
    get,
    path = "/carts/{username}",
    params(
        ("username" = String, Path, description = "Owner of the cart"),
    ),
    responses(
        (status = 200, description = "Cart found", body = CartModel),
        (status = 404, description = "No cart for this user", body = ErrorBody),
    ),
    tag = "carts"
)]
pub async fn get_cart(
    service: web::Data<CartService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let cart = service.get_cart(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(CartModel::from(&cart)))
}

/// POST /carts
///
/// Creates a cart, optionally with initial items. Quantities must be
/// positive and product ids unique.
#[utoipa::path(
    post,
    path = "/carts",
    request_body = CartModel,
    responses(
        (status = 201, description = "Cart created", body = CartModel),
        (status = 400, description = "Invalid cart", body = ErrorBody),
        (status = 409, description = "The user already has a cart", body = ErrorBody),
    ),
    tag = "carts"
)]
pub async fn create_cart(
    service: web::Data<CartService>,
    body: web::Json<CartModel>,
) -> Result<HttpResponse, AppError> {
    let cart = Cart::try_from(body.into_inner())?;
    let cart = service.create_cart(cart).await?;
    Ok(HttpResponse::Created().json(CartModel::from(&cart)))
}

/// DELETE /carts/{username}/items/{product_id}
#[utoipa::path(
    delete,
    path = "/carts/{username}/items/{product_id}",
    params(
        ("username" = String, Path, description = "Owner of the cart"),
        ("product_id" = i32, Path, description = "Product to remove"),
    ),
    responses(
        (status = 200, description = "Item removed", body = SuccessResponse),
        (status = 404, description = "Cart or item not found", body = ErrorBody),
    ),
    tag = "carts"
)]
pub async fn remove_item(
    service: web::Data<CartService>,
    path: web::Path<(String, i32)>,
) -> Result<HttpResponse, AppError> {
    let (username, product_id) = path.into_inner();
    let success = service.remove_item(&username, product_id).await?;
    Ok(HttpResponse::Ok().json(SuccessResponse { success }))
}

/// POST /carts/items
///
/// Client-streamed merge: the body is newline-delimited JSON, one
/// `MergeItemRequest` per line. The whole body is applied as one batch once
/// it has been read completely; a malformed line or a failure on any item
/// rejects the batch.
#[utoipa::path(
    post,
    path = "/carts/items",
    request_body(
        content = MergeItemRequest,
        content_type = "application/x-ndjson",
        description = "One merge request per line"
    ),
    responses(
        (status = 200, description = "Batch committed", body = MergeSummaryResponse),
        (status = 400, description = "Malformed or invalid item", body = ErrorBody),
        (status = 404, description = "Unknown cart or discount code", body = ErrorBody),
        (status = 502, description = "Discount service unavailable", body = ErrorBody),
    ),
    tag = "carts"
)]
pub async fn merge_items(
    service: web::Data<CartService>,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    let requests = ndjson::decode::<MergeItemRequest, _, _>(payload)
        .map(|line| line.and_then(MergeRequest::try_from));
    let summary = service.merge_stream(requests).await?;
    Ok(HttpResponse::Ok().json(MergeSummaryResponse::from(summary)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    use super::*;
    use crate::handlers::json_config;
    use crate::infrastructure::memory::{InMemoryCartStore, InMemoryDiscountTable};

    fn app_data() -> web::Data<CartService> {
        web::Data::new(CartService::new(
            Arc::new(InMemoryCartStore::seeded()),
            Arc::new(InMemoryDiscountTable::seeded()),
        ))
    }

    fn merge_line(product_id: i32, price: &str, code: &str) -> String {
        let request = MergeItemRequest {
            username: "swn".to_string(),
            discount_code: code.to_string(),
            product_id,
            product_name: format!("Phone {product_id}"),
            quantity: 1,
            color: "Black".to_string(),
            price: price.to_string(),
        };
        format!("{}\n", serde_json::to_string(&request).expect("serialize failed"))
    }

    #[actix_web::test]
    async fn seeded_cart_is_served() {
        let app = test::init_service(App::new().app_data(app_data()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/carts/swn").to_request();
        let cart: CartModel = test::call_and_read_body_json(&app, req).await;
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[0].product_name, "Mi10T");
    }

    #[actix_web::test]
    async fn create_conflict_and_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(app_data())
                .app_data(json_config())
                .configure(configure),
        )
        .await;

        let created = test::TestRequest::post()
            .uri("/carts")
            .set_json(CartModel {
                username: "alice".to_string(),
                items: vec![],
            })
            .to_request();
        assert_eq!(test::call_service(&app, created).await.status(), StatusCode::CREATED);

        let duplicate = test::TestRequest::post()
            .uri("/carts")
            .set_json(CartModel {
                username: "swn".to_string(),
                items: vec![],
            })
            .to_request();
        let resp = test::call_service(&app, duplicate).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.kind, "CartAlreadyExists");

        let malformed = test::TestRequest::post()
            .uri("/carts")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, malformed).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.kind, "InvalidInput");
    }

    #[actix_web::test]
    async fn remove_item_then_missing() {
        let app = test::init_service(App::new().app_data(app_data()).configure(configure)).await;
        let req = test::TestRequest::delete().uri("/carts/swn/items/1").to_request();
        let resp: SuccessResponse = test::call_and_read_body_json(&app, req).await;
        assert!(resp.success);

        let req = test::TestRequest::delete().uri("/carts/swn/items/1").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn merge_body_is_applied_as_one_batch() {
        let app = test::init_service(App::new().app_data(app_data()).configure(configure)).await;
        let body = [
            merge_line(1, "699", "CODE_100"),
            merge_line(3, "399", "CODE_100"),
            merge_line(3, "399", "CODE_100"),
        ]
        .concat();
        let req = test::TestRequest::post()
            .uri("/carts/items")
            .insert_header(("content-type", ndjson::CONTENT_TYPE))
            .set_payload(body)
            .to_request();
        let summary: MergeSummaryResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            summary,
            MergeSummaryResponse {
                success: true,
                insert_count: 2
            }
        );

        let req = test::TestRequest::get().uri("/carts/swn").to_request();
        let cart: CartModel = test::call_and_read_body_json(&app, req).await;
        let mi10t = cart.items.iter().find(|i| i.product_id == 1).expect("Mi10T missing");
        assert_eq!(mi10t.quantity, 3);
        let a50 = cart.items.iter().find(|i| i.product_id == 3).expect("A50 missing");
        assert_eq!((a50.quantity, a50.price.as_str()), (2, "299"));
    }

    #[actix_web::test]
    async fn unknown_discount_rejects_whole_body() {
        let app = test::init_service(App::new().app_data(app_data()).configure(configure)).await;
        let body = [merge_line(3, "399", "CODE_100"), merge_line(4, "10", "NOPE")].concat();
        let req = test::TestRequest::post()
            .uri("/carts/items")
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/carts/swn").to_request();
        let cart: CartModel = test::call_and_read_body_json(&app, req).await;
        assert_eq!(cart.items.len(), 2);
    }

    #[actix_web::test]
    async fn empty_merge_body_reports_nothing_merged() {
        let app = test::init_service(App::new().app_data(app_data()).configure(configure)).await;
        let req = test::TestRequest::post().uri("/carts/items").to_request();
        let summary: MergeSummaryResponse = test::call_and_read_body_json(&app, req).await;
        assert!(!summary.success);
        assert_eq!(summary.insert_count, 0);
    }
}
