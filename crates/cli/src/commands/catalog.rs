//! Catalog inspection commands.
//!
//! # Environment Variables
//!
//! - `BACKEND_URL` - Base URL of the Webcommerce backend (for `catalog list`)

use thiserror::Error;
use webcommerce_core::{Product, derive_sku};
use webcommerce_storefront::backend::{BackendClient, BackendError};
use webcommerce_storefront::config::{BackendConfig, ConfigError};

/// Errors that can occur while reading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// The backend URL is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// One table row: id, code, name, variants, stock.
fn row(product: &Product) -> String {
    format!(
        "{:<26} {:<14} {:<32} {:>8} {:>6}",
        product.id.as_str(),
        product.code,
        product.name,
        product.variants.len(),
        product.total_stock()
    )
}

/// Print every product the backend lists.
///
/// # Errors
///
/// Returns an error if `BACKEND_URL` is missing or the backend call fails.
pub async fn list() -> Result<(), CatalogError> {
    let _ = dotenvy::dotenv();
    let url = std::env::var("BACKEND_URL").map_err(|_| CatalogError::MissingEnvVar("BACKEND_URL"))?;
    let client = BackendClient::new(&BackendConfig::new(&url)?)?;

    let products = client.list_products().await?;
    tracing::info!(count = products.len(), "Fetched catalog");

    #[allow(clippy::print_stdout)]
    {
        println!(
            "{:<26} {:<14} {:<32} {:>8} {:>6}",
            "ID", "CODE", "NAME", "VARIANTS", "STOCK"
        );
        for product in &products {
            println!("{}", row(product));
        }
    }
    Ok(())
}

/// Print the SKU derived for a variant.
pub fn sku(code: &str, size: &str, color: &str) {
    #[allow(clippy::print_stdout)]
    {
        println!("{}", derive_sku(code, size, color));
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use webcommerce_core::{Category, ProductId, Variant};

    use super::*;

    #[test]
    fn test_row_shows_stock() {
        let product = Product {
            id: ProductId::new("p1"),
            name: "Camiseta".to_string(),
            code: "CAM-01".to_string(),
            cost: Decimal::new(45_000, 0),
            description: String::new(),
            image: None,
            category: Category::Women,
            variants: vec![Variant {
                size_name: "M".to_string(),
                color_name: "Rojo".to_string(),
                quantity: 7,
                sku: None,
            }],
        };
        let line = row(&product);
        assert!(line.starts_with("p1 "));
        assert!(line.contains("CAM-01"));
        assert!(line.trim_end().ends_with('7'));
    }
}
