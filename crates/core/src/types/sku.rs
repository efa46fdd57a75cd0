//! Stock-keeping units.
//!
//! A SKU identifies one sellable size/color combination of a product. It is
//! derived by concatenating the product code with the slugified size and
//! color, e.g. `CAM-001` + `M` + `Azul Marino` gives `CAM-001-M-AZUL-MARINO`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A stock-keeping unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    /// Wrap an existing SKU string as received from the backend.
    #[must_use]
    pub fn new(sku: impl Into<String>) -> Self {
        Self(sku.into())
    }

    /// Returns the SKU as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the SKU for a product variant.
///
/// Empty segments are skipped so a product without colors does not end in a
/// dangling separator.
#[must_use]
pub fn derive_sku(code: &str, size: &str, color: &str) -> Sku {
    let sku = [code, size, color]
        .iter()
        .map(|part| slugify(part))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    Sku(sku)
}

/// Slugify a code, size or color name for use inside a SKU.
///
/// Latin diacritics are folded (`Ñ` → `N`), every run of other
/// non-alphanumeric characters becomes a single `-`, and the result is
/// uppercased with no leading or trailing separator.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.trim().chars() {
        let folded = fold_diacritic(c);
        if folded.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(folded.to_ascii_uppercase());
        } else {
            pending_dash = true;
        }
    }

    out
}

const fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'Á' | 'À' | 'Ä' | 'Â' | 'Ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' | 'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
        'ñ' | 'Ñ' => 'n',
        'ç' | 'Ç' => 'c',
        other => other,
    }
}
