//! Products, variants and catalog browsing.
//!
//! Types mirror the backend's JSON (camelCase, `_id`). A product's stock
//! lives on its variants: one entry per (size, color) pair, each with its
//! own quantity and SKU.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CurrencyCode, Price, ProductId, Sku, derive_sku};

/// Errors raised while validating a product draft.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("product name is required")]
    MissingName,
    #[error("product code is required")]
    MissingCode,
    #[error("cost cannot be negative")]
    NegativeCost,
    #[error("add at least one size/color variant")]
    NoVariants,
    #[error("every variant needs both a size and a color")]
    IncompleteVariant,
    #[error("variant {size} / {color} is listed more than once")]
    DuplicateVariant { size: String, color: String },
}

/// Storefront department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Men,
    Women,
    #[serde(alias = "kidsbabies")]
    Kids,
    #[default]
    #[serde(other)]
    Other,
}

impl Category {
    /// Departments with their own landing page.
    pub const DEPARTMENTS: [Self; 3] = [Self::Men, Self::Women, Self::Kids];

    /// URL segment and wire value.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Men => "men",
            Self::Women => "women",
            Self::Kids => "kids",
            Self::Other => "other",
        }
    }

    /// Display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Men => "Hombre",
            Self::Women => "Mujer",
            Self::Kids => "Niños y bebés",
            Self::Other => "Ropa casual",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "men" => Ok(Self::Men),
            "women" => Ok(Self::Women),
            "kids" | "kidsbabies" => Ok(Self::Kids),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// One purchasable (size, color) combination of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub size_name: String,
    pub color_name: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
}

impl Variant {
    /// Whether this variant matches a (size, color) key.
    #[must_use]
    pub fn matches(&self, size: &str, color: &str) -> bool {
        same_name(&self.size_name, size) && same_name(&self.color_name, color)
    }

    /// Whether any units are left.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

/// Variant names compare trimmed and case-insensitively.
pub(crate) fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// A catalog product as served by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub code: String,
    pub cost: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl Product {
    /// The variant for a (size, color) key, if the product has one.
    #[must_use]
    pub fn find_variant(&self, size: &str, color: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.matches(size, color))
    }

    /// Units available for a combination; 0 when it does not exist.
    #[must_use]
    pub fn stock_for(&self, size: &str, color: &str) -> u32 {
        self.find_variant(size, color).map_or(0, |v| v.quantity)
    }

    /// The SKU of a variant, derived from the product code when the backend
    /// did not send one.
    #[must_use]
    pub fn sku_for(&self, variant: &Variant) -> Sku {
        variant
            .sku
            .clone()
            .unwrap_or_else(|| derive_sku(&self.code, &variant.size_name, &variant.color_name))
    }

    /// Distinct size names in first-seen order.
    #[must_use]
    pub fn sizes(&self) -> Vec<&str> {
        distinct(self.variants.iter().map(|v| v.size_name.as_str()))
    }

    /// Distinct color names in first-seen order.
    #[must_use]
    pub fn colors(&self) -> Vec<&str> {
        distinct(self.variants.iter().map(|v| v.color_name.as_str()))
    }

    /// Whether any color of this size has stock.
    #[must_use]
    pub fn is_size_available(&self, size: &str) -> bool {
        self.variants
            .iter()
            .any(|v| same_name(&v.size_name, size) && v.in_stock())
    }

    /// Whether any size of this color has stock.
    #[must_use]
    pub fn is_color_available(&self, color: &str) -> bool {
        self.variants
            .iter()
            .any(|v| same_name(&v.color_name, color) && v.in_stock())
    }

    /// Whether the product has a variant of this size, stocked or not.
    #[must_use]
    pub fn has_size(&self, size: &str) -> bool {
        self.variants.iter().any(|v| same_name(&v.size_name, size))
    }

    /// Units across all variants.
    #[must_use]
    pub fn total_stock(&self) -> u64 {
        self.variants.iter().map(|v| u64::from(v.quantity)).sum()
    }

    /// Whether any variant has stock.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.variants.iter().any(Variant::in_stock)
    }

    /// Unit price.
    #[must_use]
    pub const fn price(&self, currency: CurrencyCode) -> Price {
        Price::new(self.cost, currency)
    }

    /// An editable draft pre-filled from this product.
    #[must_use]
    pub fn to_draft(&self) -> ProductDraft {
        ProductDraft {
            name: self.name.clone(),
            code: self.code.clone(),
            cost: self.cost,
            description: self.description.clone(),
            image: self.image.clone(),
            category: self.category,
            variants: self
                .variants
                .iter()
                .map(|v| VariantDraft {
                    size: v.size_name.clone(),
                    color: v.color_name.clone(),
                    quantity: v.quantity,
                })
                .collect(),
        }
    }
}

fn distinct<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    names
        .filter(|name| seen.insert(name.trim().to_lowercase()))
        .collect()
}

// =============================================================================
// Admin drafts
// =============================================================================

/// A variant as entered in the admin product form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDraft {
    pub size: String,
    pub color: String,
    pub quantity: u32,
}

/// Product fields as entered in the admin form, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub code: String,
    pub cost: Decimal,
    pub description: String,
    pub image: Option<String>,
    pub category: Category,
    pub variants: Vec<VariantDraft>,
}

/// A validated product payload, ready to send to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidProduct {
    pub name: String,
    pub code: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub category: Category,
    pub variants: Vec<Variant>,
}

impl ProductDraft {
    /// Validate the draft and derive a SKU for every variant.
    ///
    /// Sizes are normalized to uppercase; colors keep their casing. Two
    /// variants with the same (size, color) key are rejected.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found.
    pub fn validate(self) -> Result<ValidProduct, CatalogError> {
        let name = self.name.trim().to_owned();
        let code = self.code.trim().to_owned();
        if name.is_empty() {
            return Err(CatalogError::MissingName);
        }
        if code.is_empty() {
            return Err(CatalogError::MissingCode);
        }
        if self.cost.is_sign_negative() {
            return Err(CatalogError::NegativeCost);
        }
        if self.variants.is_empty() {
            return Err(CatalogError::NoVariants);
        }

        let mut keys = HashSet::new();
        let mut variants = Vec::with_capacity(self.variants.len());
        for draft in self.variants {
            let size = draft.size.trim().to_uppercase();
            let color = draft.color.trim().to_owned();
            if size.is_empty() || color.is_empty() {
                return Err(CatalogError::IncompleteVariant);
            }
            if !keys.insert((size.to_lowercase(), color.to_lowercase())) {
                return Err(CatalogError::DuplicateVariant { size, color });
            }
            let sku = derive_sku(&code, &size, &color);
            variants.push(Variant {
                size_name: size,
                color_name: color,
                quantity: draft.quantity,
                sku: Some(sku),
            });
        }

        let image = self
            .image
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty());

        Ok(ValidProduct {
            name,
            code,
            cost: self.cost,
            description: self.description.trim().to_owned(),
            image,
            category: self.category,
            variants,
        })
    }
}

// =============================================================================
// Browsing
// =============================================================================

/// Catalog sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    /// Backend order.
    #[default]
    Featured,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// Query-string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::Name => "name",
        }
    }
}

impl FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "featured" | "" => Ok(Self::Featured),
            "price-asc" | "low-to-high" => Ok(Self::PriceAsc),
            "price-desc" | "high-to-low" => Ok(Self::PriceDesc),
            "name" => Ok(Self::Name),
            other => Err(format!("unknown sort: {other}")),
        }
    }
}

/// Filters applied to the product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<Category>,
    /// Only products offering this size.
    pub size: Option<String>,
    /// Only products costing at most this much.
    pub max_price: Option<Decimal>,
    pub in_stock_only: bool,
    pub sort: ProductSort,
}

impl ProductFilter {
    /// Filter and sort products. Sorting is stable, so ties keep backend order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let mut matched: Vec<&Product> = products
            .iter()
            .filter(|p| self.category.is_none_or(|c| p.category == c))
            .filter(|p| self.size.as_deref().is_none_or(|s| p.has_size(s)))
            .filter(|p| self.max_price.is_none_or(|max| p.cost <= max))
            .filter(|p| !self.in_stock_only || p.in_stock())
            .collect();

        match self.sort {
            ProductSort::Featured => {}
            ProductSort::PriceAsc => matched.sort_by(|a, b| a.cost.cmp(&b.cost)),
            ProductSort::PriceDesc => matched.sort_by(|a, b| b.cost.cmp(&a.cost)),
            ProductSort::Name => matched.sort_by(|a, b| compare_names(&a.name, &b.name)),
        }

        matched
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}
