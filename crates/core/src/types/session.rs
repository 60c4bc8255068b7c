//! Session identity tying a storefront visit to an external conversation.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Errors that can occur when parsing a [`SessionToken`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionTokenError {
    /// The token is empty or whitespace.
    #[error("session token cannot be empty")]
    Empty,
    /// The token is longer than [`SessionToken::MAX_LENGTH`].
    #[error("session token must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The token contains characters outside `[A-Za-z0-9._~-]`.
    #[error("session token contains invalid characters")]
    InvalidCharacters,
}

/// Opaque session token carried on the shop's launch link.
///
/// Tokens are restricted to URL-safe characters so they can double as a
/// storage key suffix.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionToken(String);

impl SessionToken {
    /// Maximum token length.
    pub const MAX_LENGTH: usize = 256;

    /// Parse a session token.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is blank, too long or not URL-safe.
    pub fn parse(s: &str) -> Result<Self, SessionTokenError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SessionTokenError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SessionTokenError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '~' | '-'))
        {
            return Err(SessionTokenError::InvalidCharacters);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens are bearer credentials; keep them out of logs.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "SessionToken({prefix}…)")
    }
}

impl TryFrom<String> for SessionToken {
    type Error = SessionTokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionToken> for String {
    fn from(token: SessionToken) -> Self {
        token.0
    }
}

/// Identity of the visitor placing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Token from the launch link.
    pub token: SessionToken,
    /// User resolved by the session service, if a lookup was performed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Contact number for order follow-up, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

impl SessionContext {
    /// Context carrying only the launch token.
    #[must_use]
    pub const fn from_token(token: SessionToken) -> Self {
        Self {
            token,
            user_id: None,
            contact: None,
        }
    }

    /// Reference sent to the order API: the resolved user, else the token.
    #[must_use]
    pub fn identity_reference(&self) -> &str {
        self.user_id
            .as_ref()
            .map_or_else(|| self.token.as_str(), UserId::as_str)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_parse() {
        assert_eq!(SessionToken::parse(" abc-123 ").unwrap().as_str(), "abc-123");
        assert_eq!(SessionToken::parse(""), Err(SessionTokenError::Empty));
        assert_eq!(
            SessionToken::parse("a b"),
            Err(SessionTokenError::InvalidCharacters)
        );
        assert_eq!(
            SessionToken::parse("../etc"),
            Err(SessionTokenError::InvalidCharacters)
        );
        assert!(matches!(
            SessionToken::parse(&"x".repeat(300)),
            Err(SessionTokenError::TooLong { .. })
        ));
    }

    #[test]
    fn test_token_debug_is_truncated() {
        let token = SessionToken::parse("supersecrettoken").unwrap();
        let debug = format!("{token:?}");
        assert!(!debug.contains("supersecrettoken"));
        assert!(debug.contains("supe"));
    }

    #[test]
    fn test_identity_reference() {
        let token = SessionToken::parse("tok").unwrap();
        let mut context = SessionContext::from_token(token);
        assert_eq!(context.identity_reference(), "tok");

        context.user_id = Some(UserId::parse("u-77").unwrap());
        assert_eq!(context.identity_reference(), "u-77");
    }
}
