//! Soko Core - Shared domain types.
//!
//! This crate provides the types used across all Soko components:
//! - `storefront` - Catalog, cart and checkout HTTP service
//! - `cli` - Command-line shop client driving the same library
//!
//! # Architecture
//!
//! The core crate contains only types and pure operations - no I/O, no
//! storage access, no HTTP clients. The cart arithmetic lives here so it can
//! be exercised without any runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, prices, quantities, categories, products, carts
//!   and session identity

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
