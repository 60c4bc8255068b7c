//! Application state shared across handlers.

use std::sync::Arc;

use crate::cart::{CartStorage, FileStorage, MemoryStorage, StorageError};
use crate::catalog::{CatalogClient, CatalogService};
use crate::checkout::{
    CheckoutSubmitter, OnOrderConfirmed, OrderClient, ParentFrameMessage, WhatsAppRedirect,
};
use crate::config::{HandoffKind, StorefrontConfig};
use crate::filter::FilterMemo;
use crate::http::{HttpClientError, build_client};
use crate::session::SessionResolver;
use crate::visit::VisitRegistry;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("HTTP client error: {0}")]
    Http(#[from] HttpClientError),
    #[error("Cart storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// upstream clients, the catalog cache and open visits.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: CatalogService,
    filters: FilterMemo,
    sessions: SessionResolver,
    visits: VisitRegistry,
    checkout: CheckoutSubmitter,
}

impl AppState {
    /// Create application state, choosing cart storage from the config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the storage
    /// directory cannot be created.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let storage = open_storage(&config)?;
        Self::with_storage(config, storage)
    }

    /// Create application state over an explicit cart storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_storage(
        config: StorefrontConfig,
        storage: Arc<dyn CartStorage>,
    ) -> Result<Self, StateError> {
        let client = build_client(&config.api)?;

        let catalog = CatalogService::new(
            CatalogClient::new(
                client.clone(),
                config.api.catalog_url.clone(),
                config.catalog.max_attempts,
            ),
            &config.catalog,
        );
        let sessions = SessionResolver::new(client.clone(), config.api.session_url.clone());
        let checkout = CheckoutSubmitter::new(
            OrderClient::new(client, config.api.orders_url.clone()),
            order_handoff(&config),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                filters: FilterMemo::new(),
                sessions,
                visits: VisitRegistry::new(storage),
                checkout,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn filters(&self) -> &FilterMemo {
        &self.inner.filters
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionResolver {
        &self.inner.sessions
    }

    #[must_use]
    pub fn visits(&self) -> &VisitRegistry {
        &self.inner.visits
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutSubmitter {
        &self.inner.checkout
    }
}

/// File storage when a directory is configured, else in-memory.
///
/// # Errors
///
/// Returns an error if the storage directory cannot be created.
pub fn open_storage(config: &StorefrontConfig) -> Result<Arc<dyn CartStorage>, StorageError> {
    Ok(match &config.storage_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "Persisting carts to disk");
            Arc::new(FileStorage::open(dir)?)
        }
        None => {
            tracing::warn!("SOKO_STORAGE_DIR not set, carts will not survive a restart");
            Arc::new(MemoryStorage::new())
        }
    })
}

/// The configured post-order handoff.
#[must_use]
pub fn order_handoff(config: &StorefrontConfig) -> Arc<dyn OnOrderConfirmed> {
    match config.checkout.handoff {
        HandoffKind::WhatsApp => Arc::new(WhatsAppRedirect::new(
            config.checkout.whatsapp_contact.clone(),
            config.checkout.currency,
        )),
        HandoffKind::ParentFrame => Arc::new(ParentFrameMessage::new(config.checkout.currency)),
    }
}
