//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use itu_shop_core::ProductCode;
use serde::Deserialize;
use tracing::instrument;

use crate::catalog::{CatalogApi, Product, ProductPage, ProductQuery};
use crate::error::Result;
use crate::state::AppState;

/// Search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Zero-based page index.
    pub page: Option<u32>,
    /// Free-text search.
    pub query: Option<String>,
    /// Category id filter.
    pub category: Option<String>,
}

impl From<SearchParams> for ProductQuery {
    fn from(params: SearchParams) -> Self {
        Self {
            page: params.page.unwrap_or(0),
            text: params.query,
            category: params.category,
        }
    }
}

/// One page of search results.
#[instrument(skip(state, params))]
pub async fn index(
    State(state): State<AppState>,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<ProductPage>> {
    let Query(params) = params?;
    let page = state.catalog().search_products(&params.into()).await?;
    Ok(Json(page))
}

/// A single product by code.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(code): Path<String>) -> Result<Json<Product>> {
    let code = ProductCode::parse(&code)?;
    let product = state.catalog().get_product(&code).await?;
    Ok(Json(product))
}
