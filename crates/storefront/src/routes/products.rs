//! Catalog route handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use soko_core::{Category, Product};
use tracing::instrument;

use crate::catalog::CatalogSource;
use crate::error::Result;
use crate::filter::{FilterState, categories as catalog_categories};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
    pub count: usize,
    pub source: CatalogSource,
    pub fallback: bool,
    pub version: u64,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
}

/// Filtered catalog.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(filter): Query<FilterState>,
) -> Result<Json<ProductsResponse>> {
    let snapshot = state.catalog().current().await?;
    let products = state.filters().apply(&snapshot, &filter).await;

    Ok(Json(ProductsResponse {
        count: products.len(),
        products: products.as_ref().clone(),
        source: snapshot.source,
        fallback: snapshot.source.is_fallback(),
        version: snapshot.version,
        fetched_at: snapshot.fetched_at,
    }))
}

/// Categories present in the current catalog.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<CategoriesResponse>> {
    let snapshot = state.catalog().current().await?;
    Ok(Json(CategoriesResponse {
        categories: catalog_categories(&snapshot.products),
    }))
}
