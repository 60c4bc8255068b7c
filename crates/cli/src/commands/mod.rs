//! CLI command implementations.

pub mod cart;
pub mod checkout;
pub mod products;

use std::path::PathBuf;
use std::sync::Arc;

use soko_core::SessionContext;
use soko_storefront::cart::{CART_KEY_PREFIX, CartStorage, CartStore, FileStorage, cart_key};
use soko_storefront::catalog::{CatalogClient, CatalogService};
use soko_storefront::checkout::CheckoutSubmitter;
use soko_storefront::checkout::OrderClient;
use soko_storefront::config::StorefrontConfig;
use soko_storefront::http::build_client;
use soko_storefront::session::SessionResolver;
use soko_storefront::state::order_handoff;

/// Cart directory used when `SOKO_STORAGE_DIR` is unset.
const DEFAULT_STORAGE_DIR: &str = ".soko";

/// Configuration and storage shared by every command.
pub struct Context {
    pub config: StorefrontConfig,
    storage: Arc<dyn CartStorage>,
}

impl Context {
    /// Load configuration from the environment and open cart storage.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is missing or invalid or the storage
    /// directory cannot be created.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config = StorefrontConfig::from_env()?;
        let dir = config
            .storage_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));
        let storage = Arc::new(FileStorage::open(dir)?);
        Ok(Self { config, storage })
    }

    /// Catalog service over the configured catalog endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn catalog(&self) -> Result<CatalogService, Box<dyn std::error::Error>> {
        let client = build_client(&self.config.api)?;
        Ok(CatalogService::new(
            CatalogClient::new(
                client,
                self.config.api.catalog_url.clone(),
                self.config.catalog.max_attempts,
            ),
            &self.config.catalog,
        ))
    }

    /// Checkout submitter over the configured order endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn submitter(&self) -> Result<CheckoutSubmitter, Box<dyn std::error::Error>> {
        let client = build_client(&self.config.api)?;
        Ok(CheckoutSubmitter::new(
            OrderClient::new(client, self.config.api.orders_url.clone()),
            order_handoff(&self.config),
        ))
    }

    /// Resolve `session`, if given.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed or the lookup fails.
    pub async fn session(
        &self,
        session: Option<&str>,
    ) -> Result<Option<SessionContext>, Box<dyn std::error::Error>> {
        let Some(raw) = session else {
            return Ok(None);
        };
        let resolver =
            SessionResolver::new(build_client(&self.config.api)?, self.config.api.session_url.clone());
        Ok(Some(resolver.resolve(Some(raw)).await?))
    }

    /// The persisted cart for `session`, or the local cart without one.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed.
    pub fn cart(&self, session: Option<&str>) -> Result<CartStore, Box<dyn std::error::Error>> {
        Ok(CartStore::restore(Arc::clone(&self.storage), storage_key(session)?))
    }
}

/// Storage key for an optional session token.
///
/// # Errors
///
/// Returns an error if the token is blank or malformed.
pub fn storage_key(session: Option<&str>) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match session {
        Some(raw) => cart_key(&SessionResolver::parse_token(Some(raw))?),
        None => CART_KEY_PREFIX.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key() {
        assert_eq!(storage_key(None).unwrap(), "soko.cart");
        assert_eq!(storage_key(Some("abc")).unwrap(), "soko.cart.abc");
        assert!(storage_key(Some("  ")).is_err());
    }
}
