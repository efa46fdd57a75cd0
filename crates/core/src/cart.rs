//! The shopping cart.
//!
//! A cart is an ordered list of [`CartLine`]s. Each line is keyed by a
//! composite [`LineKey`] built from the product ID, size and color, and the
//! cart guarantees:
//!
//! - at most one line per key (adding an existing key merges quantities);
//! - every line has quantity ≥ 1 (setting a quantity to 0 removes the line).
//!
//! The cart serializes as a plain JSON array of lines so it can be persisted
//! after every change and rehydrated with [`Cart::from_lines`], which
//! re-establishes both invariants on untrusted stored data.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Product, Variant};
use crate::types::{ProductId, Sku};

/// Cart state-transition errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("cart line not found: {0}")]
    LineNotFound(LineKey),
}

/// Composite key identifying a cart line: product ID, size and color.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineKey(String);

impl LineKey {
    const SEPARATOR: char = '|';

    /// Build the key for a product variant. Size and color are normalized
    /// so that `m` and `M` address the same line. A separator inside a part
    /// is escaped, so distinct variants never share a key.
    #[must_use]
    pub fn new(product_id: &ProductId, size: &str, color: &str) -> Self {
        Self(format!(
            "{}{sep}{}{sep}{}",
            Self::escape(product_id.as_str()),
            Self::escape(&size.trim().to_lowercase()),
            Self::escape(&color.trim().to_lowercase()),
            sep = Self::SEPARATOR
        ))
    }

    fn escape(part: &str) -> String {
        part.replace('%', "%25").replace(Self::SEPARATOR, "%7C")
    }

    /// Wrap a key received from a form.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the cart: a quantity of a specific SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub sku: Sku,
    pub name: String,
    pub size_name: String,
    pub color_name: String,
    pub cost: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl CartLine {
    /// A line for `quantity` units of one product variant, priced at the
    /// product's current cost.
    #[must_use]
    pub fn for_variant(product: &Product, variant: &Variant, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            sku: product.sku_for(variant),
            name: product.name.clone(),
            size_name: variant.size_name.clone(),
            color_name: variant.color_name.clone(),
            cost: product.cost,
            quantity,
            image: product.image.clone(),
        }
    }

    /// This line's composite key.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(&self.product_id, &self.size_name, &self.color_name)
    }

    /// Cost × quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.cost * Decimal::from(self.quantity)
    }
}

/// The shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Rebuild a cart from stored lines, dropping zero-quantity lines and
    /// merging lines that share a key.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            let quantity = line.quantity;
            // Zero-quantity lines are dropped here.
            let _ = cart.add(line, quantity);
        }
        cart
    }

    /// Add `quantity` units of `line`'s SKU. An existing line with the same
    /// key has its quantity incremented and its price, name and image
    /// refreshed; otherwise the line is appended. Returns the line's key.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ZeroQuantity`] when `quantity` is 0.
    pub fn add(&mut self, mut line: CartLine, quantity: u32) -> Result<LineKey, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        let key = line.key();
        match self.lines.iter_mut().find(|existing| existing.key() == key) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(quantity);
                existing.cost = line.cost;
                existing.name = line.name;
                existing.image = line.image;
                existing.sku = line.sku;
            }
            None => {
                line.quantity = quantity;
                self.lines.push(line);
            }
        }
        Ok(key)
    }

    /// Set a line's quantity. A quantity of 0 removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] when no line has `key`.
    pub fn update_quantity(&mut self, key: &LineKey, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(key).map(drop);
        }

        let line = self
            .lines
            .iter_mut()
            .find(|line| &line.key() == key)
            .ok_or_else(|| CartError::LineNotFound(key.clone()))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] when no line has `key`.
    pub fn remove(&mut self, key: &LineKey) -> Result<CartLine, CartError> {
        let index = self
            .position(key)
            .ok_or_else(|| CartError::LineNotFound(key.clone()))?;
        Ok(self.lines.remove(index))
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// The line for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.key() == key)
    }

    /// Units of `key` already in the cart.
    #[must_use]
    pub fn quantity_of(&self, key: &LineKey) -> u32 {
        self.get(key).map_or(0, |line| line.quantity)
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, line| acc.saturating_add(line.quantity))
    }

    /// Σ cost × quantity.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    fn position(&self, key: &LineKey) -> Option<usize> {
        self.lines.iter().position(|line| &line.key() == key)
    }
}
