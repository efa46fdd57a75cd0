//! Product detail route handler.
//!
//! The size and color pickers are plain links that carry the selection in
//! the query string (`?size=M&color=Rojo`), so the page works without
//! scripts. Each render resolves the selection against the product's
//! variants and shows the matching SKU's stock.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;
use webcommerce_core::{Product, ProductId, SelectionState, VariantSelection};

use crate::error::Result;
use crate::filters;
use crate::middleware::PageContext;
use crate::state::AppState;

/// Selection query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SelectionQuery {
    pub size: Option<String>,
    pub color: Option<String>,
}

/// A size or color chip.
#[derive(Clone)]
pub struct OptionLink {
    pub name: String,
    pub href: String,
    pub selected: bool,
    pub available: bool,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub ctx: PageContext,
    pub id: String,
    pub name: String,
    pub category: &'static str,
    pub description: String,
    pub image: Option<String>,
    pub price: String,
    pub sizes: Vec<OptionLink>,
    pub colors: Vec<OptionLink>,
    pub selected_size: String,
    pub selected_color: String,
    pub sku: String,
    pub stock_message: String,
    pub can_add: bool,
    pub max_quantity: u32,
}

/// Display product detail page.
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<String>,
    Query(query): Query<SelectionQuery>,
) -> Result<impl IntoResponse> {
    let product = state.backend().get_product(&ProductId::new(id)).await?;
    let selection = VariantSelection::new(query.size, query.color);
    let currency = state.checkout().currency;

    let resolved = selection.resolve(&product);
    let sku = resolved
        .variant()
        .map(|v| product.sku_for(v).to_string())
        .unwrap_or_default();

    Ok(ProductShowTemplate {
        ctx,
        sizes: size_links(&product, &selection),
        colors: color_links(&product, &selection),
        selected_size: selection.size.clone().unwrap_or_default(),
        selected_color: selection.color.clone().unwrap_or_default(),
        stock_message: stock_message(&resolved),
        can_add: resolved.can_add(),
        max_quantity: resolved.stock(),
        sku,
        id: product.id.to_string(),
        category: product.category.label(),
        price: product.price(currency).display(),
        name: product.name,
        description: product.description,
        image: product.image,
    })
}

/// Shopper-facing text for the selection state.
#[must_use]
pub fn stock_message(state: &SelectionState<'_>) -> String {
    match state {
        SelectionState::Incomplete => "Selecciona talla y color para ver disponibilidad".to_string(),
        SelectionState::Unavailable => "Esta combinación no está disponible".to_string(),
        SelectionState::SoldOut { .. } => "Agotado en esta combinación".to_string(),
        SelectionState::Available { stock: 1, .. } => "¡Última unidad disponible!".to_string(),
        SelectionState::Available { stock, .. } if *stock <= 5 => {
            format!("¡Últimas {stock} unidades!")
        }
        SelectionState::Available { stock, .. } => format!("{stock} unidades disponibles"),
    }
}

fn selection_href(product: &Product, size: Option<&str>, color: Option<&str>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if let Some(size) = size {
        query.append_pair("size", size);
    }
    if let Some(color) = color {
        query.append_pair("color", color);
    }
    let query = query.finish();
    if query.is_empty() {
        format!("/products/{}", product.id)
    } else {
        format!("/products/{}?{query}", product.id)
    }
}

/// Size chips. With a color chosen, a size is available only if that exact
/// combination has stock.
fn size_links(product: &Product, selection: &VariantSelection) -> Vec<OptionLink> {
    let color = selection.color.as_deref();
    product
        .sizes()
        .into_iter()
        .map(|size| OptionLink {
            name: size.to_owned(),
            href: selection_href(product, Some(size), color),
            selected: selection.is_size(size),
            available: color.map_or_else(
                || product.is_size_available(size),
                |color| product.stock_for(size, color) > 0,
            ),
        })
        .collect()
}

fn color_links(product: &Product, selection: &VariantSelection) -> Vec<OptionLink> {
    let size = selection.size.as_deref();
    product
        .colors()
        .into_iter()
        .map(|color| OptionLink {
            name: color.to_owned(),
            href: selection_href(product, size, Some(color)),
            selected: selection.is_color(color),
            available: size.map_or_else(
                || product.is_color_available(color),
                |size| product.stock_for(size, color) > 0,
            ),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;
    use webcommerce_core::{Category, Variant};

    use super::*;

    fn product() -> Product {
        let variant = |size: &str, color: &str, quantity| Variant {
            size_name: size.to_string(),
            color_name: color.to_string(),
            quantity,
            sku: None,
        };
        Product {
            id: ProductId::new("p1"),
            name: "Chaqueta".to_string(),
            code: "CHQ".to_string(),
            cost: Decimal::new(150_000, 0),
            description: String::new(),
            image: None,
            category: Category::Women,
            variants: vec![
                variant("S", "Verde oliva", 3),
                variant("M", "Verde oliva", 0),
                variant("M", "Negro", 10),
            ],
        }
    }

    #[test]
    fn test_size_links_follow_chosen_color() {
        let product = product();
        let selection = VariantSelection::new(None, Some("Verde oliva".to_string()));
        let links = size_links(&product, &selection);

        assert_eq!(links.len(), 2);
        assert!(links[0].available);
        assert!(!links[1].available, "M is sold out in olive green");
        assert_eq!(links[1].href, "/products/p1?size=M&color=Verde+oliva");
    }

    #[test]
    fn test_color_links_without_size() {
        let product = product();
        let links = color_links(&product, &VariantSelection::default());
        assert!(links.iter().all(|l| l.available));
        assert!(links.iter().all(|l| !l.selected));
        assert_eq!(links[1].href, "/products/p1?color=Negro");
    }

    #[test]
    fn test_stock_messages() {
        let product = product();
        let pick = |size: &str, color: &str| {
            VariantSelection::new(Some(size.to_string()), Some(color.to_string()))
        };

        assert_eq!(
            stock_message(&pick("S", "Verde oliva").resolve(&product)),
            "¡Últimas 3 unidades!"
        );
        assert_eq!(
            stock_message(&pick("M", "Verde oliva").resolve(&product)),
            "Agotado en esta combinación"
        );
        assert_eq!(
            stock_message(&pick("S", "Negro").resolve(&product)),
            "Esta combinación no está disponible"
        );
        assert_eq!(
            stock_message(&pick("m", "negro").resolve(&product)),
            "10 unidades disponibles"
        );
    }
}
