//! Visit lifecycle handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use super::SessionQuery;
use super::cart::CartView;
use crate::error::{AppError, Result, set_sentry_user};
use crate::session::SessionResolver;
use crate::state::AppState;
use crate::visit::lock;

#[derive(Debug, Serialize)]
pub struct VisitResponse {
    /// Identity reference orders will be placed under.
    pub identity: String,
    pub cart: CartView,
}

/// Open a visit: resolve the session and restore its cart.
///
/// Always re-resolves the session, so a reopened visit picks up a fresh
/// lookup result while keeping its cart.
#[instrument(skip(state, query))]
pub async fn open(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<(StatusCode, Json<VisitResponse>)> {
    let session = state.sessions().resolve(query.session.as_deref()).await?;
    set_sentry_user(&session.identity_reference());

    let visit = state.visits().open(session).await;
    let visit = lock(&visit);
    let identity = visit
        .session()
        .map(|session| session.identity_reference().to_string())
        .unwrap_or_default();

    Ok((
        StatusCode::CREATED,
        Json(VisitResponse {
            identity,
            cart: CartView::of(&visit, state.config().checkout.currency),
        }),
    ))
}

/// Tear a visit down. Its persisted cart is kept.
#[instrument(skip_all)]
pub async fn close(State(state): State<AppState>, Path(token): Path<String>) -> Result<StatusCode> {
    let token = SessionResolver::parse_token(Some(&token))?;
    if state.visits().end_visit(&token).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("No open visit for this session".to_string()))
    }
}
