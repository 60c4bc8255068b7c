//! Cart route handlers.
//!
//! Every handler works on the visit named by `?session=TOKEN`, opening it on
//! first use. Adding looks the product up in the current catalog so new lines
//! carry catalog data. Updating and removing act on the cart alone, so lines
//! for products that have since left the catalog can still be dropped.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use soko_core::{CartLine, CurrencyCode, Price, Product, ProductId, Quantity};
use tracing::instrument;

use super::{SessionQuery, visit_for};
use crate::cart::CartStore;
use crate::checkout::SubmissionState;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::state::AppState;
use crate::visit::{Visit, lock};

/// One cart line for display.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub unit: String,
    pub unit_price: Price,
    pub quantity: u32,
    pub line_total: Price,
    pub formatted_line_total: String,
}

/// Cart contents and totals.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total_items: u32,
    pub total_price: Price,
    pub formatted_total: String,
    pub currency: &'static str,
    pub submission: SubmissionState,
}

impl CartView {
    /// Snapshot a visit's cart for the response.
    #[must_use]
    pub fn of(visit: &Visit, currency: CurrencyCode) -> Self {
        Self::from_store(visit.cart(), visit.submission().clone(), currency)
    }

    fn from_store(cart: &CartStore, submission: SubmissionState, currency: CurrencyCode) -> Self {
        let lines = cart
            .lines()
            .iter()
            .map(|line: &CartLine| CartLineView {
                product_id: line.product.id.clone(),
                name: line.product.name.clone(),
                unit: line.product.unit.clone(),
                unit_price: line.product.price,
                quantity: line.quantity.get(),
                line_total: line.line_total(),
                formatted_line_total: currency.format(line.line_total()),
            })
            .collect();

        Self {
            lines,
            total_items: cart.total_items(),
            total_price: cart.total_price(),
            formatted_total: currency.format(cart.total_price()),
            currency: currency.code(),
            submission,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub product_id: ProductId,
    /// Defaults to 1; clamped to `1..=99`.
    #[serde(default)]
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub product_id: ProductId,
    /// Zero or below removes the line.
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    pub product_id: ProductId,
}

/// Look a product up in the current catalog.
async fn find_product(state: &AppState, id: &ProductId) -> Result<Product> {
    state
        .catalog()
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {id} is not in the catalog")))
}

/// Show the cart.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<CartView>> {
    let visit = visit_for(&state, &query).await?;
    let view = CartView::of(&lock(&visit), state.config().checkout.currency);
    Ok(Json(view))
}

/// Add a product to the cart.
#[instrument(skip(state), fields(product_id = %body.product_id))]
pub async fn add(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    Json(body): Json<AddRequest>,
) -> Result<Json<CartView>> {
    let visit = visit_for(&state, &query).await?;
    let product = find_product(&state, &body.product_id).await?;
    if !product.is_available() {
        return Err(AppError::Conflict(format!("{} is out of stock", product.name)));
    }

    let quantity = body.quantity.map_or_else(Quantity::default, Quantity::clamped);
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", product.id.as_str())]),
    );

    let mut visit = lock(&visit);
    visit.cart_mut().add(product, quantity);
    Ok(Json(CartView::of(&visit, state.config().checkout.currency)))
}

/// Set a line's quantity. Unknown lines are left alone.
#[instrument(skip(state), fields(product_id = %body.product_id))]
pub async fn update(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<CartView>> {
    let visit = visit_for(&state, &query).await?;

    let mut visit = lock(&visit);
    visit.cart_mut().set_quantity(&body.product_id, body.quantity);
    Ok(Json(CartView::of(&visit, state.config().checkout.currency)))
}

/// Remove a line. Removing an absent line is a no-op.
#[instrument(skip(state), fields(product_id = %body.product_id))]
pub async fn remove(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    Json(body): Json<RemoveRequest>,
) -> Result<Json<CartView>> {
    let visit = visit_for(&state, &query).await?;

    let mut visit = lock(&visit);
    visit.cart_mut().remove(&body.product_id);
    Ok(Json(CartView::of(&visit, state.config().checkout.currency)))
}

/// Empty the cart.
#[instrument(skip(state))]
pub async fn clear(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<CartView>> {
    let visit = visit_for(&state, &query).await?;

    let mut visit = lock(&visit);
    visit.cart_mut().clear();
    Ok(Json(CartView::of(&visit, state.config().checkout.currency)))
}
