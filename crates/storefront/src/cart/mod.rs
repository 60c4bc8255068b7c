//! Persistent cart store.
//!
//! [`CartStore`] wraps a [`Cart`] and writes it to a [`CartStorage`] after
//! every mutation. Persistence never fails a mutation: write errors are
//! logged and the in-memory cart stays authoritative.

pub mod storage;

use std::sync::Arc;

use soko_core::{Cart, CartLine, Price, Product, ProductId, Quantity};

pub use storage::{
    CART_KEY_PREFIX, CartStorage, FileStorage, MemoryStorage, StorageError, cart_key,
};

/// A cart bound to a storage key.
pub struct CartStore {
    cart: Cart,
    storage: Arc<dyn CartStorage>,
    key: String,
}

impl CartStore {
    /// Load the cart stored under `key`.
    ///
    /// Missing, unreadable and corrupt values all yield an empty cart; the
    /// latter two are logged. A corrupt value is overwritten on the next
    /// mutation.
    #[must_use]
    pub fn restore(storage: Arc<dyn CartStorage>, key: impl Into<String>) -> Self {
        let key = key.into();

        let cart = match storage.get(&key) {
            Ok(Some(blob)) => match serde_json::from_str::<Cart>(&blob) {
                Ok(cart) => {
                    tracing::debug!(key = %key, lines = cart.len(), "Cart restored");
                    cart
                }
                Err(source) => {
                    let error = StorageError::Corrupt {
                        key: key.clone(),
                        source,
                    };
                    tracing::warn!(error = %error, "Discarding corrupt persisted cart");
                    Cart::new()
                }
            },
            Ok(None) => Cart::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted cart, starting empty");
                Cart::new()
            }
        };

        Self { cart, storage, key }
    }

    /// Add `quantity` units of `product`, merging with an existing line.
    pub fn add(&mut self, product: Product, quantity: Quantity) {
        tracing::debug!(product_id = %product.id, quantity = quantity.get(), "Cart add");
        self.cart.add(product, quantity);
        self.persist();
    }

    /// Remove the line for `product_id`. Removing an absent line is a no-op.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let removed = self.cart.remove(product_id);
        if removed {
            tracing::debug!(product_id = %product_id, "Cart remove");
            self.persist();
        }
        removed
    }

    /// Set a line's quantity; zero or below removes it.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: i64) -> bool {
        let changed = self.cart.set_quantity(product_id, quantity);
        if changed {
            tracing::debug!(product_id = %product_id, quantity, "Cart set quantity");
            self.persist();
        }
        changed
    }

    /// Empty the cart and drop its persisted value.
    pub fn clear(&mut self) {
        self.cart.clear();
        if let Err(e) = self.storage.remove(&self.key) {
            tracing::warn!(error = %e, "Failed to clear persisted cart");
        }
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.cart.line(product_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.cart.total_items()
    }

    #[must_use]
    pub fn total_price(&self) -> Price {
        self.cart.total_price()
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.cart)
            .map_err(|source| StorageError::Corrupt {
                key: self.key.clone(),
                source,
            })
            .and_then(|blob| self.storage.set(&self.key, &blob));

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist cart");
        }
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("key", &self.key)
            .field("cart", &self.cart)
            .finish_non_exhaustive()
    }
}
