//! Resolving the launch link's `session` parameter into a [`SessionContext`].

use serde::Deserialize;
use soko_core::{SessionContext, SessionToken, SessionTokenError, UserId};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::http::log_excerpt;

/// Errors resolving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No token on the request.
    #[error("Open the shop from the link you received")]
    Missing,

    /// The token is malformed.
    #[error("Invalid session token: {0}")]
    Invalid(#[from] SessionTokenError),

    /// The session service does not know the token.
    #[error("Unknown session")]
    Unknown,

    /// The session service could not be reached.
    #[error("Session lookup failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The session service answered with an unexpected status or body.
    #[error("Session lookup returned {status}")]
    Lookup { status: u16 },

    /// The configured lookup URL cannot take a path segment.
    #[error("Session lookup URL cannot be a base: {0}")]
    InvalidLookupUrl(String),
}

#[derive(Debug, Deserialize)]
struct SessionRecord {
    user_id: Option<UserId>,
    #[serde(default)]
    phone: Option<String>,
}

/// Turns raw `session` parameters into session contexts.
#[derive(Clone)]
pub struct SessionResolver {
    client: reqwest::Client,
    lookup_url: Option<Url>,
}

impl SessionResolver {
    /// Without a `lookup_url` the token itself is the identity reference.
    #[must_use]
    pub const fn new(client: reqwest::Client, lookup_url: Option<Url>) -> Self {
        Self { client, lookup_url }
    }

    /// Parse a raw token, treating absent and blank values as missing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Missing`] or [`SessionError::Invalid`].
    pub fn parse_token(raw: Option<&str>) -> Result<SessionToken, SessionError> {
        match raw.map(str::trim) {
            None | Some("") => Err(SessionError::Missing),
            Some(raw) => Ok(SessionToken::parse(raw)?),
        }
    }

    /// Resolve `raw` into a session context.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is missing or malformed, or if the
    /// lookup service rejects it or cannot be reached.
    pub async fn resolve(&self, raw: Option<&str>) -> Result<SessionContext, SessionError> {
        let token = Self::parse_token(raw)?;
        match &self.lookup_url {
            Some(base) => self.lookup(base, token).await,
            None => Ok(SessionContext::from_token(token)),
        }
    }

    #[instrument(skip(self, base), fields(session = ?token))]
    async fn lookup(&self, base: &Url, token: SessionToken) -> Result<SessionContext, SessionError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| SessionError::InvalidLookupUrl(base.to_string()))?
            .pop_if_empty()
            .push(token.as_str());

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::info!("Session not recognized");
            return Err(SessionError::Unknown);
        }

        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = %status, body = %log_excerpt(&body), "Session lookup failed");
            return Err(SessionError::Lookup {
                status: status.as_u16(),
            });
        }

        let record: SessionRecord = serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(error = %e, "Unparseable session record");
            SessionError::Lookup {
                status: status.as_u16(),
            }
        })?;

        Ok(SessionContext {
            token,
            user_id: record.user_id,
            contact: record.phone.filter(|phone| !phone.trim().is_empty()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_blank_tokens() {
        assert!(matches!(SessionResolver::parse_token(None), Err(SessionError::Missing)));
        assert!(matches!(
            SessionResolver::parse_token(Some("   ")),
            Err(SessionError::Missing)
        ));
        assert!(matches!(
            SessionResolver::parse_token(Some("a/b")),
            Err(SessionError::Invalid(SessionTokenError::InvalidCharacters))
        ));
    }

    #[tokio::test]
    async fn test_resolve_without_lookup_uses_token() {
        let resolver = SessionResolver::new(reqwest::Client::new(), None);
        let context = resolver.resolve(Some("tok-9")).await.unwrap();
        assert_eq!(context.identity_reference(), "tok-9");
        assert!(context.user_id.is_none());
    }

    #[test]
    fn test_missing_message() {
        assert_eq!(
            SessionError::Missing.to_string(),
            "Open the shop from the link you received"
        );
    }

    #[test]
    fn test_session_record_numeric_user() {
        let record: SessionRecord =
            serde_json::from_str(r#"{"user_id": 77, "phone": "+2348000000000"}"#).unwrap();
        assert_eq!(record.user_id.unwrap().as_str(), "77");
    }
}
