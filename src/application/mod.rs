//! Application layer orchestrating the cart domain.
//!
//! `OrderSession` is the entry point for callers: it resolves dishes through
//! the catalog, applies commands atomically and persists the cart through a
//! `CartStore` after each one.

pub mod session;
