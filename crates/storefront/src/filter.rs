//! Search and category filtering over a catalog snapshot.
//!
//! [`filter`] is pure; [`FilterMemo`] caches its results per catalog version so
//! repeated queries against an unchanged catalog skip the scan.

use std::sync::Arc;

use moka::future::Cache;
use serde::Deserialize;
use soko_core::{Category, CategoryFilter, Product};

use crate::catalog::CatalogSnapshot;

/// Number of distinct (version, term, category) results kept.
const MEMO_CAPACITY: u64 = 256;

/// Transient filter inputs, as sent on the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FilterState {
    /// Free-text search term.
    #[serde(default, alias = "search")]
    pub q: String,
    /// Category selector; `all` or absent means no restriction.
    #[serde(default)]
    pub category: CategoryFilter,
}

/// Products matching `search_term` and `category`, in catalog order.
///
/// A product matches when its category is admitted and the trimmed term is
/// empty or appears case-insensitively in its name or description.
#[must_use]
pub fn filter(catalog: &[Product], search_term: &str, category: &CategoryFilter) -> Vec<Product> {
    let term = normalize_term(search_term);
    catalog
        .iter()
        .filter(|product| category.admits(&product.category) && matches_term(product, &term))
        .cloned()
        .collect()
}

/// Distinct categories in the order they first appear.
#[must_use]
pub fn categories(catalog: &[Product]) -> Vec<Category> {
    let mut seen: Vec<Category> = Vec::new();
    for product in catalog {
        if !seen.contains(&product.category) {
            seen.push(product.category.clone());
        }
    }
    seen
}

fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

fn matches_term(product: &Product, term: &str) -> bool {
    term.is_empty()
        || product.name.to_lowercase().contains(term)
        || product
            .description
            .as_deref()
            .is_some_and(|description| description.to_lowercase().contains(term))
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct MemoKey {
    version: u64,
    term: String,
    category: CategoryFilter,
}

/// Memoized [`filter`] keyed on catalog version, normalized term and category.
#[derive(Clone)]
pub struct FilterMemo {
    cache: Cache<MemoKey, Arc<Vec<Product>>>,
}

impl FilterMemo {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().max_capacity(MEMO_CAPACITY).build(),
        }
    }

    /// Filtered products for `state` against `snapshot`.
    pub async fn apply(&self, snapshot: &CatalogSnapshot, state: &FilterState) -> Arc<Vec<Product>> {
        let key = MemoKey {
            version: snapshot.version,
            term: normalize_term(&state.q),
            category: state.category.clone(),
        };
        let products = Arc::clone(&snapshot.products);
        let term = key.term.clone();
        let category = key.category.clone();

        self.cache
            .get_with(key, async move { Arc::new(filter(&products, &term, &category)) })
            .await
    }

    /// Number of memoized results.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for FilterMemo {
    fn default() -> Self {
        Self::new()
    }
}
