//! Storefront-side models.
//!
//! Products, orders and users are owned by the backend and modeled in
//! `webcommerce-core`; this module only holds what the storefront keeps in
//! the visitor's session.

pub mod session;

pub use session::{Flash, FlashKind, keys as session_keys};
