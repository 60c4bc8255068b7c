//! Catalog listing.

use soko_core::{CategoryFilter, CurrencyCode, Product};
use soko_storefront::catalog::{CatalogError, CatalogService, ProductSource};
use soko_storefront::filter::{categories, filter};

/// List products matching `search` and `category`.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub async fn list<S: ProductSource>(
    catalog: &CatalogService<S>,
    search: &str,
    category: &str,
    currency: CurrencyCode,
) -> Result<Vec<Product>, CatalogError> {
    let snapshot = catalog.current().await?;
    if snapshot.source.is_fallback() {
        tracing::warn!(source = ?snapshot.source, "Catalog service unavailable, showing fallback catalog");
    }

    let products = filter(&snapshot.products, search, &CategoryFilter::parse(category));

    let names: Vec<String> = categories(&snapshot.products)
        .iter()
        .map(ToString::to_string)
        .collect();
    tracing::info!("Categories: {}", names.join(", "));

    for product in &products {
        let stock = if product.is_available() {
            format!("{} in stock", product.available_stock.count())
        } else {
            "out of stock".to_string()
        };
        tracing::info!(
            "{:<24} {:<20} {:>12} / {:<8} [{}] {}",
            product.id,
            product.name,
            currency.format(product.price),
            product.unit,
            product.category,
            stock
        );
    }
    tracing::info!("{} of {} products", products.len(), snapshot.products.len());

    Ok(products)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use soko_storefront::catalog::defaults::default_catalog;
    use soko_storefront::config::{CatalogConfig, FallbackPolicy};

    use super::*;

    struct Unreachable;

    impl ProductSource for Unreachable {
        async fn fetch_products(&self) -> Result<Vec<Product>, CatalogError> {
            Err(CatalogError::Status {
                status: 503,
                message: "down".to_string(),
            })
        }
    }

    struct Fixed;

    impl ProductSource for Fixed {
        async fn fetch_products(&self) -> Result<Vec<Product>, CatalogError> {
            Ok(default_catalog())
        }
    }

    #[tokio::test]
    async fn test_list_filters_by_search_and_category() {
        let catalog = CatalogService::new(Fixed, &CatalogConfig::default());

        let grains = list(&catalog, "", "grains", CurrencyCode::GHS).await.unwrap();
        assert!(!grains.is_empty());
        assert!(grains.iter().all(|p| p.category.as_str() == "grains"));

        let quinoa = list(&catalog, "  QUINOA ", "all", CurrencyCode::GHS).await.unwrap();
        assert_eq!(quinoa.len(), 1);
        assert_eq!(quinoa[0].id.as_str(), "5");
    }

    #[tokio::test]
    async fn test_list_uses_default_catalog_when_unreachable() {
        let catalog = CatalogService::new(Unreachable, &CatalogConfig::default());
        let products = list(&catalog, "", "all", CurrencyCode::GHS).await.unwrap();
        assert_eq!(products.len(), default_catalog().len());
    }

    #[tokio::test]
    async fn test_list_strict_surfaces_failure() {
        let config = CatalogConfig {
            fallback: FallbackPolicy::Strict,
            ..CatalogConfig::default()
        };
        let catalog = CatalogService::new(Unreachable, &config);
        assert!(list(&catalog, "", "all", CurrencyCode::GHS).await.is_err());
    }
}
