//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness check
//! GET    /health/ready                - Readiness (catalog reachable or fallback)
//!
//! # Catalog
//! GET    /api/products?q=&category=   - Filtered catalog
//! GET    /api/categories              - Categories present in the catalog
//!
//! # Visits
//! POST   /api/visits?session=TOKEN    - Open a visit, restoring its cart
//! DELETE /api/visits/{token}          - Tear a visit down
//!
//! # Cart (all take ?session=TOKEN)
//! GET    /api/cart                    - Cart lines and totals
//! POST   /api/cart/add                - { product_id, quantity? }
//! POST   /api/cart/update             - { product_id, quantity }
//! POST   /api/cart/remove             - { product_id }
//! POST   /api/cart/clear              - Empty the cart
//!
//! # Checkout
//! POST   /api/checkout?session=TOKEN  - Place the order, returns the handoff
//! ```

pub mod cart;
pub mod checkout;
pub mod products;
pub mod visits;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderName, Method, Request, StatusCode, header::CONTENT_TYPE},
    routing::{delete, get, post},
};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::error::Result;
use crate::session::SessionResolver;
use crate::state::AppState;
use crate::visit::VisitHandle;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// `?session=TOKEN` as carried on the launch link.
#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub session: Option<String>,
}

/// The visit for `session`, opening it (and resolving the session) if needed.
///
/// # Errors
///
/// Returns an error if the token is missing or malformed or the session
/// cannot be resolved.
pub async fn visit_for(state: &AppState, query: &SessionQuery) -> Result<VisitHandle> {
    let token = SessionResolver::parse_token(query.session.as_deref())?;
    if let Some(visit) = state.visits().get(&token).await {
        return Ok(visit);
    }

    let session = state.sessions().resolve(Some(token.as_str())).await?;
    Ok(state.visits().open(session).await)
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/categories", get(products::categories))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest(
            "/api",
            catalog_routes()
                .route("/visits", post(visits::open))
                .route("/visits/{token}", delete(visits::close))
                .nest("/cart", cart_routes())
                .route("/checkout", post(checkout::place_order)),
        )
}

/// The full application: routes, state, tracing, request ids and CORS.
///
/// Sentry layers are added by the binary so tests run without a hub.
pub fn router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    routes().with_state(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id,
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::new(request_id))
            .layer(cors),
    )
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 if no catalog can be served (strict policy with the catalog
/// service down, or a malformed catalog).
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.catalog().current().await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
