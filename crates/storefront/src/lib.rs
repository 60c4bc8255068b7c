//! Soko storefront library.
//!
//! Catalog fetching, filtering, per-visit carts and checkout, exposed as a
//! library so the HTTP binary, the `soko` CLI and the integration tests share
//! one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod routes;
pub mod session;
pub mod state;
pub mod visit;
