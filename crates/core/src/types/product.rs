//! Catalog products and cart lines.

use serde::{Deserialize, Serialize};

use super::category::Category;
use super::id::ProductId;
use super::price::Price;
use super::quantity::Quantity;

/// Units in stock for a product.
///
/// Older catalog revisions sent a boolean availability flag; it is read as a
/// count of `1` (available) or `0` (sold out).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "StockRepr", into = "u32")]
pub struct Stock(u32);

impl Stock {
    /// Create a stock count.
    #[must_use]
    pub const fn new(count: u32) -> Self {
        Self(count)
    }

    /// Units in stock.
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0
    }

    /// Whether at least one unit can be sold.
    #[must_use]
    pub const fn is_available(self) -> bool {
        self.0 > 0
    }
}

impl From<Stock> for u32 {
    fn from(stock: Stock) -> Self {
        stock.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StockRepr {
    Count(u32),
    Flag(bool),
}

impl From<StockRepr> for Stock {
    fn from(repr: StockRepr) -> Self {
        match repr {
            StockRepr::Count(count) => Self(count),
            StockRepr::Flag(available) => Self(u32::from(available)),
        }
    }
}

/// A product in the catalog.
///
/// Products are immutable once fetched; a re-fetch replaces the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    /// Unit the price applies to (e.g., "tuber", "kg", "bag").
    #[serde(default)]
    pub unit: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub available_stock: Stock,
}

impl Product {
    /// Whether the product can currently be added to a cart.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.available_stock.is_available()
    }
}

/// A product and the quantity selected for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: Quantity,
}

impl CartLine {
    /// Create a cart line.
    #[must_use]
    pub const fn new(product: Product, quantity: Quantity) -> Self {
        Self { product, quantity }
    }

    /// Identifier of the line's product.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_from_bool_or_count() {
        let stock: Stock = serde_json::from_str("true").unwrap();
        assert_eq!(stock.count(), 1);
        let stock: Stock = serde_json::from_str("false").unwrap();
        assert!(!stock.is_available());
        let stock: Stock = serde_json::from_str("12").unwrap();
        assert_eq!(stock.count(), 12);
    }

    #[test]
    fn test_product_minimal_json() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "Garri",
            "price": "2.00",
            "category": "Grains"
        }))
        .unwrap();

        assert_eq!(product.id.as_str(), "3");
        assert_eq!(product.category.as_str(), "grains");
        assert!(product.description.is_none());
        assert!(!product.is_available());
    }

    #[test]
    fn test_line_total() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "yam",
            "name": "Yam",
            "price": "8.50",
            "unit": "tuber",
            "category": "tubers",
            "available_stock": 10
        }))
        .unwrap();
        let line = CartLine::new(product, Quantity::clamped(5));
        assert_eq!(line.line_total().to_string(), "42.50");
    }
}
