//! Webcommerce Core - Domain types and cart logic.
//!
//! This crate provides the types shared by every Webcommerce component:
//! - `storefront` - Public catalog, cart, checkout and the admin console
//! - `cli` - Command-line tools for migrations and catalog inspection
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O,
//! no database access, no HTTP clients. Products and orders are owned by the
//! external backend; the types here mirror its JSON wire format.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, SKUs and statuses
//! - [`catalog`] - Products, variants, admin drafts and catalog filtering
//! - [`selection`] - Matching a size/color selection to a stock-bearing variant
//! - [`cart`] - The shopping cart and its quantity invariants
//! - [`order`] - Checkout quotes, order payloads and backend orders
//! - [`user`] - The signed-in user as reported by the backend

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod order;
pub mod selection;
pub mod types;
pub mod user;

pub use cart::{Cart, CartError, CartLine, LineKey};
pub use catalog::{
    CatalogError, Category, Product, ProductDraft, ProductFilter, ProductSort, ValidProduct,
    Variant, VariantDraft,
};
pub use order::{
    CheckoutQuote, NewOrder, Order, OrderError, OrderItem, OrderPage, ShippingAddress,
    SIMULATED_PAYMENT_METHOD,
};
pub use selection::{SelectionError, SelectionState, VariantSelection};
pub use types::*;
pub use user::User;
