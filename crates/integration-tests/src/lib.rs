//! Integration tests for the Soko storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p soko-integration-tests
//! ```
//!
//! No external services are needed: [`StubUpstream`] serves the catalog,
//! order and session endpoints on an ephemeral local port, and
//! [`StubUpstream::config`] points a [`StorefrontConfig`] at it.
//!
//! # Test Categories
//!
//! - `catalog` - Fetch, validation, retry and fallback against a live socket
//! - `storefront` - The HTTP API end to end: visits, cart, checkout, handoff

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use soko_core::CurrencyCode;
use soko_storefront::config::{
    ApiConfig, CatalogConfig, CheckoutConfig, FallbackPolicy, HandoffKind, StorefrontConfig,
};
use soko_storefront::http::API_KEY_HEADER;
use tokio::task::JoinHandle;
use url::Url;

pub use axum::http::StatusCode;

/// API key the stub expects and the test config sends.
pub const TEST_API_KEY: &str = "integration-test-key-7c1d";

/// WhatsApp contact used by the test config.
pub const TEST_CONTACT: &str = "2348012345678";

// =============================================================================
// Replies
// =============================================================================

/// A canned upstream response.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(StatusCode, Value),
    Text(StatusCode, String),
}

impl Reply {
    /// `200 OK` with a JSON body.
    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self::Json(StatusCode::OK, body)
    }

    /// An error status with a `{ "detail": ... }` body.
    #[must_use]
    pub fn error(status: StatusCode, detail: &str) -> Self {
        Self::Json(status, json!({ "detail": detail }))
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Self::Json(status, body) => (status, Json(body)).into_response(),
            Self::Text(status, body) => (status, body).into_response(),
        }
    }
}

/// An order submission as the stub received it.
#[derive(Debug, Clone)]
pub struct RecordedOrder {
    pub body: Value,
    pub idempotency_key: Option<String>,
    pub api_key: Option<String>,
}

/// Catalog used unless a test scripts another: three products over three
/// categories, one sold out, exercising the accepted wire variants.
#[must_use]
pub fn sample_catalog() -> Value {
    json!({
        "products": [
            {
                "id": "yam-01",
                "name": "Puna Yam",
                "price": "8.50",
                "unit": "tuber",
                "category": "Tubers",
                "description": "Large white yam from Benue",
                "available_stock": 12
            },
            {
                "id": 2,
                "name": "Ofada Rice",
                "price": "12.00",
                "unit": "kg",
                "category": "grains",
                "description": "Unpolished local rice",
                "available_stock": true
            },
            {
                "id": "oil-01",
                "name": "Palm Oil",
                "price": "15.00",
                "unit": "litre",
                "category": "oils",
                "available_stock": 0
            }
        ]
    })
}

// =============================================================================
// Stub upstream
// =============================================================================

#[derive(Default)]
struct Upstream {
    catalog: Mutex<VecDeque<Reply>>,
    catalog_hits: AtomicUsize,
    catalog_api_keys: Mutex<Vec<Option<String>>>,
    orders: Mutex<VecDeque<Reply>>,
    recorded: Mutex<Vec<RecordedOrder>>,
    sessions: Mutex<HashMap<String, Value>>,
}

/// Catalog, order and session services on one local port.
///
/// Each endpoint answers from a script: replies are consumed in order and the
/// last one repeats.
pub struct StubUpstream {
    upstream: Arc<Upstream>,
    catalog_url: Url,
    orders_url: Url,
    session_url: Url,
    task: JoinHandle<()>,
}

impl StubUpstream {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let upstream = Arc::new(Upstream::default());
        script(&upstream.catalog, [Reply::ok(sample_catalog())]);
        script(&upstream.orders, [Reply::ok(json!({ "order_id": 1001 }))]);

        let app = Router::new()
            .route("/catalog", get(catalog))
            .route("/orders", post(orders))
            .route("/sessions/{token}", get(session))
            .with_state(Arc::clone(&upstream));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let base = Url::parse(&format!("http://{}/", listener.local_addr()?))?;

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Stub upstream stopped");
            }
        });

        Ok(Self {
            upstream,
            catalog_url: base.join("catalog")?,
            orders_url: base.join("orders")?,
            session_url: base.join("sessions")?,
            task,
        })
    }

    /// Storefront config pointed at this stub, with session lookup enabled.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        StorefrontConfig {
            host: [127, 0, 0, 1].into(),
            port: 0,
            api: ApiConfig {
                catalog_url: self.catalog_url.clone(),
                orders_url: self.orders_url.clone(),
                session_url: Some(self.session_url.clone()),
                api_key: SecretString::from(TEST_API_KEY),
                timeout: Duration::from_secs(5),
            },
            catalog: CatalogConfig {
                fallback: FallbackPolicy::DefaultCatalog,
                cache_ttl: Duration::from_secs(300),
                max_attempts: 3,
            },
            checkout: CheckoutConfig {
                handoff: HandoffKind::WhatsApp,
                whatsapp_contact: TEST_CONTACT.to_string(),
                currency: CurrencyCode::GHS,
            },
            storage_dir: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    #[must_use]
    pub fn catalog_url(&self) -> &Url {
        &self.catalog_url
    }

    /// Replace the catalog script.
    pub fn script_catalog(&self, replies: impl IntoIterator<Item = Reply>) {
        script(&self.upstream.catalog, replies);
    }

    /// Replace the order script.
    pub fn script_orders(&self, replies: impl IntoIterator<Item = Reply>) {
        script(&self.upstream.orders, replies);
    }

    /// Register a session the lookup endpoint will recognize.
    pub fn add_session(&self, token: &str, user_id: &str, phone: Option<&str>) {
        self.upstream
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                token.to_string(),
                json!({ "user_id": user_id, "phone": phone }),
            );
    }

    /// Number of catalog requests served.
    #[must_use]
    pub fn catalog_hits(&self) -> usize {
        self.upstream.catalog_hits.load(Ordering::SeqCst)
    }

    /// API keys sent with each catalog request.
    #[must_use]
    pub fn catalog_api_keys(&self) -> Vec<Option<String>> {
        self.upstream
            .catalog_api_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Orders received so far.
    #[must_use]
    pub fn orders(&self) -> Vec<RecordedOrder> {
        self.upstream
            .recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for StubUpstream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn script(slot: &Mutex<VecDeque<Reply>>, replies: impl IntoIterator<Item = Reply>) {
    *slot.lock().unwrap_or_else(PoisonError::into_inner) = replies.into_iter().collect();
}

fn next_reply(slot: &Mutex<VecDeque<Reply>>) -> Reply {
    let mut replies = slot.lock().unwrap_or_else(PoisonError::into_inner);
    let reply = if replies.len() > 1 {
        replies.pop_front()
    } else {
        replies.front().cloned()
    };
    reply.unwrap_or_else(|| Reply::error(StatusCode::INTERNAL_SERVER_ERROR, "nothing scripted"))
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

async fn catalog(State(upstream): State<Arc<Upstream>>, headers: HeaderMap) -> Reply {
    upstream.catalog_hits.fetch_add(1, Ordering::SeqCst);
    upstream
        .catalog_api_keys
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(header(&headers, API_KEY_HEADER));
    next_reply(&upstream.catalog)
}

async fn orders(
    State(upstream): State<Arc<Upstream>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    upstream
        .recorded
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(RecordedOrder {
            body,
            idempotency_key: header(&headers, "idempotency-key"),
            api_key: header(&headers, API_KEY_HEADER),
        });
    next_reply(&upstream.orders)
}

async fn session(State(upstream): State<Arc<Upstream>>, Path(token): Path<String>) -> Response {
    let record = upstream
        .sessions
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&token)
        .cloned();
    match record {
        Some(record) => Json(record).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
