//! Shared HTTP client for upstream APIs.
//!
//! The catalog, order and session clients all talk to the same backend with
//! the same API key, so they share one `reqwest::Client` built here with the
//! key installed as a default header.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::ApiConfig;

/// Header carrying the upstream API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Errors building the upstream HTTP client.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// The API key cannot be sent as a header value.
    #[error("Invalid API key format: {0}")]
    InvalidApiKey(String),

    /// The client failed to build (TLS backend, etc.).
    #[error("HTTP client error: {0}")]
    Build(#[from] reqwest::Error),
}

/// Build the upstream client with the API key and timeout from `config`.
///
/// # Errors
///
/// Returns an error if the API key is not a valid header value or the
/// client fails to build.
pub fn build_client(config: &ApiConfig) -> Result<reqwest::Client, HttpClientError> {
    let mut headers = HeaderMap::new();

    let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
        .map_err(|e| HttpClientError::InvalidApiKey(e.to_string()))?;
    api_key.set_sensitive(true);
    headers.insert(API_KEY_HEADER, api_key);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .user_agent(concat!("soko-storefront/", env!("CARGO_PKG_VERSION")))
        .build()?;

    Ok(client)
}

/// Pull a human-readable reason out of an upstream error body.
///
/// Looks for `detail`, `message` or `error` string fields in a JSON object.
/// Returns `None` for empty, non-JSON or field-less bodies.
#[must_use]
pub fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "message", "error"]
        .iter()
        .find_map(|field| value.get(field)?.as_str())
        .map(str::trim)
        .filter(|detail| !detail.is_empty())
        .map(str::to_owned)
}

/// Truncate an upstream body for logging.
#[must_use]
pub fn log_excerpt(body: &str) -> String {
    body.chars().take(500).collect()
}
