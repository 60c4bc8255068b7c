//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error body is JSON: `{ "error": <reason code>, "message": <text> }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::checkout::CheckoutError;
use crate::session::SessionError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog fetch or validation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Session missing, malformed or not resolvable.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Checkout precondition or submission failure.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request conflicts with current state (e.g., product out of stock).
    #[error("Conflict: {0}")]
    Conflict(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Catalog(_) => StatusCode::BAD_GATEWAY,
            Self::Session(err) => match err {
                SessionError::Missing | SessionError::Unknown => StatusCode::UNAUTHORIZED,
                SessionError::Invalid(_) => StatusCode::BAD_REQUEST,
                SessionError::Http(_)
                | SessionError::Lookup { .. }
                | SessionError::InvalidLookupUrl(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Checkout(err) => match err {
                CheckoutError::MissingSession => StatusCode::UNAUTHORIZED,
                CheckoutError::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutError::AlreadySubmitting => StatusCode::CONFLICT,
                CheckoutError::Rejected { .. } | CheckoutError::Transport(_) => {
                    StatusCode::BAD_GATEWAY
                }
                CheckoutError::VisitClosed => StatusCode::GONE,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Stable reason code for the response body.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Catalog(CatalogError::Validation(_)) => "catalog_invalid",
            Self::Catalog(_) => "catalog_unavailable",
            Self::Session(err) => match err {
                SessionError::Missing => "missing_session",
                SessionError::Invalid(_) => "invalid_session",
                SessionError::Unknown => "unknown_session",
                SessionError::Http(_)
                | SessionError::Lookup { .. }
                | SessionError::InvalidLookupUrl(_) => "session_lookup_failed",
            },
            Self::Checkout(err) => err.reason(),
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
        }
    }

    /// Whether this error is our (or an upstream's) fault and worth reporting.
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Catalog(_)
                | Self::Session(
                    SessionError::Http(_)
                        | SessionError::Lookup { .. }
                        | SessionError::InvalidLookupUrl(_)
                )
                | Self::Checkout(CheckoutError::Transport(_))
        )
    }

    /// Message shown to the client. Internal details stay in logs.
    fn client_message(&self) -> String {
        match self {
            Self::Catalog(_) => "The product catalog is unavailable right now".to_string(),
            Self::Session(SessionError::Missing) => SessionError::Missing.to_string(),
            Self::Session(SessionError::Invalid(_) | SessionError::Unknown) => {
                "This shop link is not valid. Open the shop from the link you received".to_string()
            }
            Self::Session(_) => "Could not verify your session right now".to_string(),
            Self::Checkout(err) => err.to_string(),
            Self::NotFound(msg) | Self::Conflict(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = ErrorBody {
            error: self.reason(),
            message: self.client_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a resolved session.
///
/// Call this once the session is known to associate errors with the visitor.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "yam-puna")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
