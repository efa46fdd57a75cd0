//! Matching a shopper's size/color selection to a stock-bearing variant.

use thiserror::Error;

use crate::catalog::{Product, Variant};

/// Why a selection cannot be added to the cart.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("choose a size and a color")]
    Incomplete,
    #[error("this size/color combination does not exist")]
    Unavailable,
    #[error("this size/color combination is sold out")]
    SoldOut,
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("only {available} more unit(s) available")]
    InsufficientStock { available: u32 },
}

/// The size and color currently chosen on a product page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantSelection {
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Outcome of resolving a selection against a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState<'a> {
    /// Size or color not chosen yet.
    Incomplete,
    /// The product has no variant for this combination.
    Unavailable,
    /// The variant exists but has no units.
    SoldOut { variant: &'a Variant },
    /// The variant can be bought, up to `stock` units.
    Available { variant: &'a Variant, stock: u32 },
}

impl VariantSelection {
    /// Create a selection, treating blank values as unselected.
    #[must_use]
    pub fn new(size: Option<String>, color: Option<String>) -> Self {
        Self {
            size: size.filter(|s| !s.trim().is_empty()),
            color: color.filter(|c| !c.trim().is_empty()),
        }
    }

    /// Whether `size` is the chosen size.
    #[must_use]
    pub fn is_size(&self, size: &str) -> bool {
        self.size
            .as_deref()
            .is_some_and(|s| crate::catalog::same_name(s, size))
    }

    /// Whether `color` is the chosen color.
    #[must_use]
    pub fn is_color(&self, color: &str) -> bool {
        self.color
            .as_deref()
            .is_some_and(|c| crate::catalog::same_name(c, color))
    }

    /// Resolve the selection against the product's variants.
    #[must_use]
    pub fn resolve<'a>(&self, product: &'a Product) -> SelectionState<'a> {
        let (Some(size), Some(color)) = (self.size.as_deref(), self.color.as_deref()) else {
            return SelectionState::Incomplete;
        };

        match product.find_variant(size, color) {
            None => SelectionState::Unavailable,
            Some(variant) if variant.in_stock() => SelectionState::Available {
                variant,
                stock: variant.quantity,
            },
            Some(variant) => SelectionState::SoldOut { variant },
        }
    }
}

impl<'a> SelectionState<'a> {
    /// Whether the selection can be added to the cart.
    #[must_use]
    pub const fn can_add(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    /// The matched variant, in stock or not.
    #[must_use]
    pub const fn variant(&self) -> Option<&'a Variant> {
        match self {
            Self::SoldOut { variant } | Self::Available { variant, .. } => Some(*variant),
            Self::Incomplete | Self::Unavailable => None,
        }
    }

    /// Units available for the selection.
    #[must_use]
    pub const fn stock(&self) -> u32 {
        match self {
            Self::Available { stock, .. } => *stock,
            _ => 0,
        }
    }

    /// Check that `requested` more units fit, given `in_cart` units already
    /// in the cart for the same line.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectionError`] when the selection is not purchasable or
    /// the combined quantity exceeds the variant's stock.
    pub fn check_quantity(&self, requested: u32, in_cart: u32) -> Result<&'a Variant, SelectionError> {
        let (variant, stock) = match *self {
            Self::Incomplete => return Err(SelectionError::Incomplete),
            Self::Unavailable => return Err(SelectionError::Unavailable),
            Self::SoldOut { .. } => return Err(SelectionError::SoldOut),
            Self::Available { variant, stock } => (variant, stock),
        };

        if requested == 0 {
            return Err(SelectionError::ZeroQuantity);
        }

        let available = stock.saturating_sub(in_cart);
        if requested > available {
            return Err(SelectionError::InsufficientStock { available });
        }

        Ok(variant)
    }
}
