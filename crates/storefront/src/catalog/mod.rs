//! Product catalog retrieval.
//!
//! # Architecture
//!
//! - [`CatalogClient`] fetches the raw product list over HTTP and runs it
//!   through the [`schema`] validation layer
//! - [`CatalogService`] wraps any [`ProductSource`] with an in-memory `moka`
//!   cache and the fallback policy
//! - [`defaults`] holds the built-in catalog served when the catalog service
//!   is unreachable
//!
//! # Failure Policy
//!
//! Transport failures (unreachable host, timeout, non-success status, body
//! that is not JSON) are retried and may fall back to a known catalog.
//! Validation failures mean the service answered with something malformed;
//! they are never retried and never replaced with a fallback.

pub mod defaults;
pub mod schema;
mod service;

use std::future::Future;
use std::time::Duration;

use soko_core::Product;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::http::{error_detail, log_excerpt};

pub use schema::SchemaError;
pub use service::{CatalogService, CatalogSnapshot, CatalogSource};

/// Delay between fetch attempts.
const RETRY_DELAY: Duration = Duration::from_millis(250);

/// Errors that can occur when fetching the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The catalog service answered with a non-success status.
    #[error("Catalog service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body was not JSON.
    #[error("Catalog response is not JSON: {0}")]
    NotJson(#[source] serde_json::Error),

    /// The payload was JSON but failed schema validation.
    #[error("Catalog failed validation: {0}")]
    Validation(#[from] SchemaError),
}

impl CatalogError {
    /// Whether this is a transport failure (eligible for retry and fallback).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::NotJson(_) | Self::Validation(_) => false,
        }
    }
}

/// Anything that can produce a validated product list.
pub trait ProductSource: Send + Sync {
    /// Fetch the full catalog.
    fn fetch_products(&self) -> impl Future<Output = Result<Vec<Product>, CatalogError>> + Send;
}

/// HTTP client for the remote catalog service.
#[derive(Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    endpoint: Url,
    max_attempts: u32,
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// `client` must already carry the API key header (see
    /// [`crate::http::build_client`]).
    #[must_use]
    pub fn new(client: reqwest::Client, endpoint: Url, max_attempts: u32) -> Self {
        Self {
            client,
            endpoint,
            max_attempts: max_attempts.max(1),
        }
    }

    /// One GET + validation round trip.
    async fn fetch_once(&self) -> Result<Vec<Product>, CatalogError> {
        let response = self.client.get(self.endpoint.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %log_excerpt(&body),
                "Catalog service returned non-success status"
            );
            return Err(CatalogError::Status {
                status: status.as_u16(),
                message: error_detail(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
            });
        }

        let payload: serde_json::Value =
            serde_json::from_str(&body).map_err(CatalogError::NotJson)?;

        Ok(schema::validate_catalog(&payload)?)
    }
}

impl ProductSource for CatalogClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch_products(&self) -> Result<Vec<Product>, CatalogError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once().await {
                Ok(products) => {
                    tracing::debug!(count = products.len(), attempt, "Catalog fetched");
                    return Ok(products);
                }
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    tracing::debug!(error = %e, attempt, "Transient catalog failure, retrying");
                    attempt += 1;
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
