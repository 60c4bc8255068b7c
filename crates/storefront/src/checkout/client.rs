//! Order submission API client.

use std::future::Future;

use serde::{Deserialize, Serialize};
use soko_core::{OrderId, Price, ProductId, UserId};
use thiserror::Error;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use crate::http::{error_detail, log_excerpt};

/// Header carrying the per-action idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// One ordered item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Order payload, snapshotted from the cart before submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Identity reference: resolved user id, else the session token.
    pub session: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    pub items: Vec<OrderItem>,
    pub total: Price,
}

/// Successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderReceipt {
    pub order_id: OrderId,
}

/// Errors from the order API.
#[derive(Debug, Error)]
pub enum OrderApiError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The order service answered with a non-success status.
    #[error("Order rejected with {status}")]
    Rejected {
        status: u16,
        /// Reason from the response body, if any.
        detail: Option<String>,
    },

    /// A success status without a usable order id.
    #[error("Invalid order response: {0}")]
    InvalidResponse(String),
}

/// The remote order endpoint.
pub trait OrderApi: Send + Sync {
    /// Submit `request` once. Never retried automatically.
    fn submit(
        &self,
        request: &OrderRequest,
        idempotency_key: Uuid,
    ) -> impl Future<Output = Result<OrderReceipt, OrderApiError>> + Send;
}

/// HTTP client for the order service.
#[derive(Clone)]
pub struct OrderClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl OrderClient {
    /// Create a new order client.
    ///
    /// `client` must already carry the API key header.
    #[must_use]
    pub const fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

impl OrderApi for OrderClient {
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    async fn submit(
        &self,
        request: &OrderRequest,
        idempotency_key: Uuid,
    ) -> Result<OrderReceipt, OrderApiError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key.to_string())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %log_excerpt(&body),
                "Order service rejected submission"
            );
            return Err(OrderApiError::Rejected {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        serde_json::from_str::<OrderReceipt>(&body).map_err(|e| {
            tracing::error!(error = %e, body = %log_excerpt(&body), "Unparseable order response");
            OrderApiError::InvalidResponse(e.to_string())
        })
    }
}
