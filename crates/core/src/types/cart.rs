//! Cart contents and the arithmetic over them.
//!
//! [`Cart`] is the pure in-memory half of the cart store: it owns the lines and
//! enforces the invariants, while persistence lives in the storefront crate.
//!
//! # Invariants
//!
//! - At most one line per product id
//! - Every line quantity is within `1..=99`
//! - Lines keep their insertion order
//! - Totals are recomputed from the lines on every call

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;
use super::product::{CartLine, Product};
use super::quantity::Quantity;

/// An ordered set of cart lines keyed by product id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add `quantity` units of `product`.
    ///
    /// An existing line is incremented (saturating at 99) and picks up the
    /// latest product data; otherwise a new line is appended.
    pub fn add(&mut self, product: Product, quantity: Quantity) {
        match self.position(&product.id) {
            Some(index) => {
                if let Some(line) = self.lines.get_mut(index) {
                    line.quantity = line.quantity.saturating_add(quantity);
                    line.product = product;
                }
            }
            None => self.lines.push(CartLine::new(product, quantity)),
        }
    }

    /// Remove the line for `product_id`. Returns whether a line was removed.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id() != product_id);
        self.lines.len() != before
    }

    /// Set the quantity of an existing line.
    ///
    /// Zero or negative quantities remove the line; larger values are clamped
    /// to 99. Returns whether the cart changed shape or content.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove(product_id);
        }

        let quantity = Quantity::clamped(quantity);
        match self.lines.iter_mut().find(|line| line.product_id() == product_id) {
            Some(line) if line.quantity != quantity => {
                line.quantity = quantity;
                true
            }
            _ => false,
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// The line for `product_id`, if present.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id() == product_id)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity.get()).sum()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.product_id() == product_id)
    }
}

impl From<Vec<CartLine>> for Cart {
    /// Build a cart from raw lines, merging any duplicate product ids.
    fn from(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            cart.add(line.product, line.quantity);
        }
        cart
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}
