//! Core types for Soko.
//!
//! This module provides type-safe wrappers for the storefront's domain concepts.

pub mod cart;
pub mod category;
pub mod id;
pub mod price;
pub mod product;
pub mod quantity;
pub mod session;

pub use cart::Cart;
pub use category::{Category, CategoryError, CategoryFilter, KNOWN_CATEGORIES, UNCATEGORIZED};
pub use id::*;
pub use price::{CurrencyCode, Price, PriceError};
pub use product::{CartLine, Product, Stock};
pub use quantity::Quantity;
pub use session::{SessionContext, SessionToken, SessionTokenError};
