//! Cart editing against a persisted cart.

use soko_core::{CurrencyCode, ProductId, Quantity};
use soko_storefront::cart::CartStore;
use soko_storefront::catalog::{CatalogService, ProductSource};

/// Add `quantity` of a catalog product.
///
/// # Errors
///
/// Returns an error if the id is malformed, the catalog cannot be loaded,
/// or the product is unknown or out of stock.
pub async fn add<S: ProductSource>(
    catalog: &CatalogService<S>,
    store: &mut CartStore,
    product_id: &str,
    quantity: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = ProductId::parse(product_id)?;
    let product = catalog
        .find(&id)
        .await?
        .ok_or_else(|| format!("Product {id} is not in the catalog"))?;
    if !product.is_available() {
        return Err(format!("{} is out of stock", product.name).into());
    }

    let quantity = Quantity::clamped(quantity);
    tracing::info!("Adding {quantity} x {}", product.name);
    store.add(product, quantity);
    Ok(())
}

/// Set a line's quantity; zero or below removes it.
///
/// A product that is not in the cart is left alone.
///
/// # Errors
///
/// Returns an error if the id is malformed.
pub fn set(
    store: &mut CartStore,
    product_id: &str,
    quantity: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = ProductId::parse(product_id)?;
    if !store.set_quantity(&id, quantity) {
        tracing::info!("Product {id} is not in the cart, nothing to change");
    }
    Ok(())
}

/// Remove a line. Removing a product that is not in the cart is a no-op.
///
/// # Errors
///
/// Returns an error if the id is malformed.
pub fn remove(store: &mut CartStore, product_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let id = ProductId::parse(product_id)?;
    if !store.remove(&id) {
        tracing::info!("Product {id} is not in the cart, nothing to remove");
    }
    Ok(())
}

pub fn clear(store: &mut CartStore) {
    store.clear();
    tracing::info!("Cart cleared");
}

/// Log cart lines and totals.
pub fn show(store: &CartStore, currency: CurrencyCode) {
    if store.is_empty() {
        tracing::info!("Cart is empty");
        return;
    }

    for line in store.lines() {
        tracing::info!(
            "{:>3} x {:<20} {:>12}",
            line.quantity,
            line.product.name,
            currency.format(line.line_total())
        );
    }
    tracing::info!(
        "{} items, total {}",
        store.total_items(),
        currency.format(store.total_price())
    );
}
