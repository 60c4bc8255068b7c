//! Checkout handler.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use super::{SessionQuery, visit_for};
use crate::checkout::OrderConfirmation;
use crate::error::{Result, add_breadcrumb, set_sentry_user};
use crate::state::AppState;
use crate::visit::lock;

/// Place the visit's order and return the handoff.
///
/// The handler keeps only a weak reference to the visit while the order is
/// in flight, so tearing the visit down discards the result.
#[instrument(skip_all)]
pub async fn place_order(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<OrderConfirmation>> {
    let visit = visit_for(&state, &query).await?;

    let identity = lock(&visit)
        .session()
        .map(|session| session.identity_reference().to_string());
    if let Some(identity) = &identity {
        set_sentry_user(identity);
    }
    add_breadcrumb("checkout", "Order submitted", None);

    let weak = Arc::downgrade(&visit);
    drop(visit);

    let confirmation = state.checkout().place_order(&weak).await?;
    Ok(Json(confirmation))
}
