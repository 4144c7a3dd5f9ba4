//! reqwest-backed adapters for talking to the other services.
//!
//! Error responses carry an [`ErrorBody`]; it is turned back into the typed
//! [`DomainError`] the remote side reported. Anything that never produced a
//! response (refused connection, reset, undecodable body) is a transport error.

use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use crate::contracts::{
    CartModel, DiscountModel, ErrorBody, MergeItemRequest, MergeSummaryResponse, ProductInput,
    ProductModel,
};
use crate::domain::cart::{Cart, MergeSummary};
use crate::domain::discount::Discount;
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartGateway, CatalogSource, DiscountLookup, ProductGateway, ProductStream};
use crate::domain::product::{NewProduct, Product};
use crate::domain::upload::MergeUpload;
use crate::ndjson;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

impl From<reqwest::Error> for DomainError {
    fn from(e: reqwest::Error) -> Self {
        DomainError::Transport(e.to_string())
    }
}

pub fn build_http_client() -> Result<Client, DomainError> {
    Ok(Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?)
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, DomainError> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| DomainError::InvalidInput(format!("{base} cannot be used as a base URL")))?;
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}

async fn check(response: Response) -> Result<Response, DomainError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await?;
    match serde_json::from_slice::<ErrorBody>(&body) {
        Ok(error) => Err(error.into_domain_error()),
        Err(_) => Err(DomainError::Transport(format!(
            "unexpected {status} response: {}",
            String::from_utf8_lossy(&body)
        ))),
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, DomainError> {
    Ok(check(response).await?.json::<T>().await?)
}

// ── Discounts ─────────────────────────────────────────────────────────────────

pub struct HttpDiscountClient {
    http: Client,
    base: Url,
}

impl HttpDiscountClient {
    pub fn new(http: Client, base: Url) -> Self {
        Self { http, base }
    }
}

#[async_trait]
impl DiscountLookup for HttpDiscountClient {
    async fn get_discount(&self, code: &str) -> Result<Discount, DomainError> {
        let url = endpoint(&self.base, &["discounts", code])?;
        let model: DiscountModel = read_json(self.http.get(url).send().await?).await?;
        Discount::try_from(model)
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

pub struct HttpCatalogClient {
    http: Client,
    base: Url,
}

impl HttpCatalogClient {
    pub fn new(http: Client, base: Url) -> Self {
        Self { http, base }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogClient {
    async fn list_products(&self) -> Result<ProductStream, DomainError> {
        let url = endpoint(&self.base, &["products"])?;
        let response = check(self.http.get(url).send().await?).await?;
        let products = ndjson::decode::<ProductModel, _, _>(response.bytes_stream())
            .and_then(|model| async move { Product::try_from(model) });
        Ok(products.boxed())
    }
}

// ── Products ──────────────────────────────────────────────────────────────────

pub struct HttpProductClient {
    http: Client,
    base: Url,
}

impl HttpProductClient {
    pub fn new(http: Client, base: Url) -> Self {
        Self { http, base }
    }
}

#[async_trait]
impl ProductGateway for HttpProductClient {
    async fn add_product(&self, product: NewProduct) -> Result<Product, DomainError> {
        let url = endpoint(&self.base, &["products"])?;
        let response = self
            .http
            .post(url)
            .json(&ProductInput::from(&product))
            .send()
            .await?;
        let model: ProductModel = read_json(response).await?;
        Product::try_from(model)
    }
}

// ── Carts ─────────────────────────────────────────────────────────────────────

pub struct HttpCartClient {
    http: Client,
    base: Url,
}

impl HttpCartClient {
    pub fn new(http: Client, base: Url) -> Self {
        Self { http, base }
    }
}

#[async_trait]
impl CartGateway for HttpCartClient {
    async fn get_cart(&self, username: &str) -> Result<Cart, DomainError> {
        let url = endpoint(&self.base, &["carts", username])?;
        let model: CartModel = read_json(self.http.get(url).send().await?).await?;
        Cart::try_from(model)
    }

    async fn create_cart(&self, cart: Cart) -> Result<Cart, DomainError> {
        let url = endpoint(&self.base, &["carts"])?;
        let response = self
            .http
            .post(url)
            .json(&CartModel::from(&cart))
            .send()
            .await?;
        let model: CartModel = read_json(response).await?;
        Cart::try_from(model)
    }

    /// Starts a streamed `POST /carts/items`. Lines are written to the
    /// request body as they are sent on the upload.
    async fn open_merge(&self) -> Result<MergeUpload, DomainError> {
        let url = endpoint(&self.base, &["carts", "items"])?;
        let http = self.http.clone();
        Ok(MergeUpload::open(move |requests| {
            let body = requests
                .map(|request| request.and_then(|r| ndjson::encode(&MergeItemRequest::from(&r))));
            tokio::spawn(async move {
                let response = http
                    .post(url)
                    .header(CONTENT_TYPE, ndjson::CONTENT_TYPE)
                    .body(reqwest::Body::wrap_stream(body))
                    .send()
                    .await?;
                let summary: MergeSummaryResponse = read_json(response).await?;
                Ok::<MergeSummary, DomainError>(summary.into())
            })
        }))
    }
}
