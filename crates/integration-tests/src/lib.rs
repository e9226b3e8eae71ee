//! Integration tests for the ITU Shop storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p itu-shop-integration-tests
//! ```
//!
//! Nothing external is needed: each test starts a [`FakeCatalog`] (the OAuth
//! token endpoint and the OCC REST resources the storefront reads) and the
//! real storefront router, both on ephemeral `127.0.0.1` ports.
//!
//! # Test Categories
//!
//! - `cart` - Session carts, anti-forgery checks and priced views
//! - `catalog` - Product search and detail, category counts, health

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use itu_shop_storefront::config::{CatalogConfig, LogFormat, StorefrontConfig};
use itu_shop_storefront::state::AppState;
use reqwest::Client;
use secrecy::SecretString;
use serde_json::{Value, json};

/// Bearer token the fake catalog issues and accepts.
pub const FAKE_ACCESS_TOKEN: &str = "fake-access-token";

/// OCC site path the fake catalog serves under.
const SITE_PATH: &str = "/occ/v2/itu";

/// A product the fake catalog can serve.
#[derive(Debug, Clone)]
pub struct FakeProduct {
    pub code: String,
    pub name: String,
    /// Decimal price, e.g. `"10.00"`.
    pub price: String,
    pub url: Option<String>,
    pub category: Option<String>,
}

impl FakeProduct {
    /// A CHF product without category data.
    #[must_use]
    pub fn new(code: &str, price: &str) -> Self {
        Self {
            code: code.to_string(),
            name: format!("Product {code}"),
            price: price.to_string(),
            url: None,
            category: None,
        }
    }

    /// Set the product page URL.
    #[must_use]
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// Attach a structural category reference.
    #[must_use]
    pub fn in_category(mut self, code: &str) -> Self {
        self.category = Some(code.to_string());
        self
    }

    fn to_json(&self) -> Value {
        let price: f64 = self.price.parse().unwrap();
        let categories: Vec<Value> = self
            .category
            .iter()
            .map(|code| json!({ "code": code }))
            .collect();

        json!({
            "code": self.code,
            "name": self.name,
            "url": self.url,
            "price": {
                "value": price,
                "currencyIso": "CHF",
                "formattedValue": format!("CHF {price:.2}"),
            },
            "stock": { "stockLevelStatus": "inStock" },
            "images": [
                { "imageType": "PRIMARY", "format": "product", "url": format!("/medias/{}.jpg", self.code) }
            ],
            "categories": categories,
        })
    }
}

#[derive(Default)]
struct FakeCatalogInner {
    products: Vec<FakeProduct>,
    categories: Value,
    page_size: usize,
    failing_codes: Mutex<HashSet<String>>,
    token_requests: AtomicUsize,
    search_requests: AtomicUsize,
}

/// In-process stand-in for the upstream catalog.
#[derive(Clone)]
pub struct FakeCatalog {
    inner: Arc<FakeCatalogInner>,
    addr: SocketAddr,
}

impl FakeCatalog {
    /// Start a fake catalog serving `products` in pages of `page_size`, with
    /// the category tree `categories` (a JSON array of `{id, name,
    /// subcategories}` nodes).
    pub async fn start(products: Vec<FakeProduct>, categories: Value, page_size: usize) -> Self {
        let inner = Arc::new(FakeCatalogInner {
            products,
            categories,
            page_size,
            ..FakeCatalogInner::default()
        });

        let app = Router::new()
            .route("/oauth/token", post(issue_token))
            .route(&format!("{SITE_PATH}/products/search"), get(search))
            .route(&format!("{SITE_PATH}/products/{{code}}"), get(product))
            .route(
                &format!("{SITE_PATH}/catalogs/{{catalog}}/{{version}}"),
                get(catalog_version),
            )
            .with_state(inner.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { inner, addr }
    }

    /// Base URL of the fake server.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make product lookups for `code` fail with a 500 from now on.
    pub fn fail_product(&self, code: &str) {
        self.inner
            .failing_codes
            .lock()
            .unwrap()
            .insert(code.to_string());
    }

    /// Number of token exchanges served so far.
    #[must_use]
    pub fn token_requests(&self) -> usize {
        self.inner.token_requests.load(Ordering::SeqCst)
    }

    /// Number of search pages served so far.
    #[must_use]
    pub fn search_requests(&self) -> usize {
        self.inner.search_requests.load(Ordering::SeqCst)
    }

    /// Storefront configuration pointing at this fake.
    #[must_use]
    pub fn storefront_config(&self) -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://localhost".to_string(),
            catalog: CatalogConfig {
                client_id: "itu_integration".to_string(),
                client_secret: SecretString::from("integration-client-secret"),
                token_url: format!("{}/oauth/token", self.url()),
                api_base_url: format!("{}{SITE_PATH}", self.url()),
                image_base_url: self.url(),
                catalog_id: "ituProductCatalog".to_string(),
                catalog_version: "Online".to_string(),
                excluded_categories: vec!["Brands".to_string()],
                request_timeout: Duration::from_secs(5),
                max_crawl_pages: 200,
                crawl_timeout: Duration::from_secs(30),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
            log_format: LogFormat::Pretty,
        }
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {FAKE_ACCESS_TOKEN}"))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "errors": [{ "type": "InvalidTokenError" }] })),
    )
        .into_response()
}

async fn issue_token(State(inner): State<Arc<FakeCatalogInner>>, body: String) -> Response {
    inner.token_requests.fetch_add(1, Ordering::SeqCst);

    if !body.contains("grant_type=client_credentials") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unsupported_grant_type" })),
        )
            .into_response();
    }

    Json(json!({
        "access_token": FAKE_ACCESS_TOKEN,
        "token_type": "bearer",
        "expires_in": 3600,
    }))
    .into_response()
}

async fn search(
    State(inner): State<Arc<FakeCatalogInner>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    inner.search_requests.fetch_add(1, Ordering::SeqCst);

    let category = params
        .get("query")
        .and_then(|q| q.split_once(":relevance:allCategories:"))
        .map(|(_, id)| id.to_string());
    let matching: Vec<&FakeProduct> = inner
        .products
        .iter()
        .filter(|p| category.is_none() || p.category == category)
        .collect();

    let current_page: usize = params
        .get("currentPage")
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);
    let page_size = inner.page_size.max(1);
    let total_pages = matching.len().div_ceil(page_size);
    let products: Vec<Value> = matching
        .iter()
        .skip(current_page * page_size)
        .take(page_size)
        .map(|p| p.to_json())
        .collect();

    Json(json!({
        "products": products,
        "pagination": {
            "currentPage": current_page,
            "pageSize": page_size,
            "totalPages": total_pages,
            "totalResults": matching.len(),
        },
    }))
    .into_response()
}

async fn product(
    State(inner): State<Arc<FakeCatalogInner>>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if inner.failing_codes.lock().unwrap().contains(&code) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }

    match inner.products.iter().find(|p| p.code == code) {
        Some(product) => Json(product.to_json()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "errors": [{ "type": "UnknownIdentifierError" }] })),
        )
            .into_response(),
    }
}

async fn catalog_version(
    State(inner): State<Arc<FakeCatalogInner>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    Json(json!({ "categories": inner.categories })).into_response()
}

/// The storefront running against a [`FakeCatalog`].
pub struct TestStorefront {
    /// Cookie-keeping client; one client is one shopper session.
    pub client: Client,
    pub base_url: String,
    pub catalog: FakeCatalog,
}

impl TestStorefront {
    /// Start the storefront router on an ephemeral port.
    pub async fn start(catalog: FakeCatalog) -> Self {
        let state = AppState::new(catalog.storefront_config()).unwrap();
        let app = itu_shop_storefront::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            client: shopper_client(),
            base_url: format!("http://{addr}"),
            catalog,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Start the session and return its anti-forgery token.
    pub async fn csrf_token(&self, client: &Client) -> String {
        let body: Value = client
            .get(self.url("/api/session"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["csrfToken"].as_str().unwrap().to_string()
    }

    /// POST a JSON body to a cart mutation route with the given token.
    pub async fn post_cart(
        &self,
        client: &Client,
        action: &str,
        token: &str,
        body: &Value,
    ) -> reqwest::Response {
        client
            .post(self.url(&format!("/api/cart/{action}")))
            .header("x-csrf-token", token)
            .json(body)
            .send()
            .await
            .unwrap()
    }
}

/// A fresh shopper: a client with its own cookie jar.
#[must_use]
pub fn shopper_client() -> Client {
    Client::builder().cookie_store(true).build().unwrap()
}

/// Category tree used by most tests: two product categories and a
/// `Brands` grouping that must never be counted.
#[must_use]
pub fn default_categories() -> Value {
    json!([
        {
            "id": "root",
            "name": "Products",
            "subcategories": [
                { "id": "cables", "name": "Cables", "subcategories": [] },
                { "id": "adapters", "name": "Power Adapters", "subcategories": [] },
            ],
        },
        {
            "id": "brands",
            "name": "Brands",
            "subcategories": [],
        },
    ])
}
