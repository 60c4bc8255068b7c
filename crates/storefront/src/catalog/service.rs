//! Cached catalog access with an explicit fallback policy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use soko_core::{Product, ProductId};
use tracing::instrument;

use super::defaults::default_catalog;
use super::{CatalogClient, CatalogError, ProductSource};
use crate::config::{CatalogConfig, FallbackPolicy};

/// How long a fallback catalog is served before the remote is tried again.
const FALLBACK_COOLDOWN: Duration = Duration::from_secs(30);

/// Where a catalog snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    /// Freshly fetched from the catalog service.
    Remote,
    /// The last catalog successfully fetched, served because the service is down.
    LastKnownGood,
    /// The built-in default catalog, served because the service is down.
    BuiltInDefault,
}

impl CatalogSource {
    /// Whether this snapshot is a substitute for a failed fetch.
    #[must_use]
    pub const fn is_fallback(self) -> bool {
        !matches!(self, Self::Remote)
    }
}

/// An immutable catalog version.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    /// Products in display order.
    pub products: Arc<Vec<Product>>,
    /// Where the products came from.
    pub source: CatalogSource,
    /// Increases whenever the product list is replaced.
    pub version: u64,
    /// When the products were obtained.
    pub fetched_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// Look up a product by id.
    #[must_use]
    pub fn find(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|product| &product.id == id)
    }
}

/// Cache key for catalog snapshots.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Catalog,
}

/// Catalog access for handlers: cache, fetch, and fall back per policy.
pub struct CatalogService<S = CatalogClient> {
    source: S,
    policy: FallbackPolicy,
    cache: Cache<CacheKey, CatalogSnapshot>,
    last_good: RwLock<Option<CatalogSnapshot>>,
    fallback: RwLock<Option<(Instant, CatalogSnapshot)>>,
    versions: AtomicU64,
}

impl<S: ProductSource> CatalogService<S> {
    /// Create a catalog service over `source`.
    #[must_use]
    pub fn new(source: S, config: &CatalogConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.cache_ttl)
            .build();

        Self {
            source,
            policy: config.fallback,
            cache,
            last_good: RwLock::new(None),
            fallback: RwLock::new(None),
            versions: AtomicU64::new(0),
        }
    }

    /// The current catalog: cached, fallback during cooldown, else fetched.
    ///
    /// # Errors
    ///
    /// Returns validation failures always, and transport failures under
    /// [`FallbackPolicy::Strict`].
    pub async fn current(&self) -> Result<CatalogSnapshot, CatalogError> {
        if let Some(snapshot) = self.cache.get(&CacheKey::Catalog).await {
            return Ok(snapshot);
        }
        if let Some(snapshot) = self.active_fallback() {
            return Ok(snapshot);
        }
        self.refresh().await
    }

    /// Fetch from the source, bypassing the cache.
    ///
    /// # Errors
    ///
    /// See [`CatalogService::current`].
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<CatalogSnapshot, CatalogError> {
        match self.source.fetch_products().await {
            Ok(products) => {
                let snapshot = CatalogSnapshot {
                    products: Arc::new(products),
                    source: CatalogSource::Remote,
                    version: self.next_version(),
                    fetched_at: Utc::now(),
                };
                tracing::info!(
                    count = snapshot.products.len(),
                    version = snapshot.version,
                    "Catalog refreshed"
                );

                self.cache.insert(CacheKey::Catalog, snapshot.clone()).await;
                *self.last_good.write().unwrap_or_else(PoisonError::into_inner) =
                    Some(snapshot.clone());
                *self.fallback.write().unwrap_or_else(PoisonError::into_inner) = None;
                Ok(snapshot)
            }
            Err(e) if e.is_transport() && self.policy == FallbackPolicy::DefaultCatalog => {
                Ok(self.fall_back(&e))
            }
            Err(e) => {
                tracing::error!(error = %e, policy = ?self.policy, "Catalog fetch failed");
                Err(e)
            }
        }
    }

    /// Look up a product in the current catalog.
    ///
    /// # Errors
    ///
    /// See [`CatalogService::current`].
    pub async fn find(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.current().await?.find(id).cloned())
    }

    fn fall_back(&self, error: &CatalogError) -> CatalogSnapshot {
        let last_good = self
            .last_good
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let snapshot = match last_good {
            Some(snapshot) => CatalogSnapshot {
                source: CatalogSource::LastKnownGood,
                ..snapshot
            },
            None => CatalogSnapshot {
                products: Arc::new(default_catalog()),
                source: CatalogSource::BuiltInDefault,
                version: self.next_version(),
                fetched_at: Utc::now(),
            },
        };

        tracing::warn!(
            error = %error,
            source = ?snapshot.source,
            count = snapshot.products.len(),
            "Catalog service unreachable, serving fallback catalog"
        );

        *self.fallback.write().unwrap_or_else(PoisonError::into_inner) =
            Some((Instant::now(), snapshot.clone()));
        snapshot
    }

    fn active_fallback(&self) -> Option<CatalogSnapshot> {
        let fallback = self.fallback.read().unwrap_or_else(PoisonError::into_inner);
        fallback
            .as_ref()
            .filter(|(since, _)| since.elapsed() < FALLBACK_COOLDOWN)
            .map(|(_, snapshot)| snapshot.clone())
    }

    fn next_version(&self) -> u64 {
        self.versions.fetch_add(1, Ordering::Relaxed) + 1
    }
}
