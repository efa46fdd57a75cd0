//! Catalog listing route handlers.
//!
//! `/catalog` lists every product; `/men`, `/women` and `/kids` are the same
//! listing scoped to one department. All four accept the filter query
//! `?size=&max_price=&in_stock=&sort=`.

use std::collections::HashSet;
use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;
use webcommerce_core::{Category, Product, ProductFilter, ProductSort};

use crate::error::Result;
use crate::filters;
use crate::middleware::PageContext;
use crate::routes::views::ProductCard;
use crate::state::AppState;

/// Listing filter query parameters, as submitted by the filter form.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub size: Option<String>,
    pub max_price: Option<String>,
    pub in_stock: Option<String>,
    pub sort: Option<String>,
}

impl CatalogQuery {
    /// Build the product filter. Unparseable values are ignored.
    #[must_use]
    pub fn to_filter(&self, category: Option<Category>) -> ProductFilter {
        ProductFilter {
            category,
            size: self
                .size
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
            max_price: self
                .max_price
                .as_deref()
                .and_then(|s| Decimal::from_str(s.trim()).ok())
                .filter(|max| !max.is_sign_negative()),
            in_stock_only: self
                .in_stock
                .as_deref()
                .is_some_and(|v| matches!(v, "on" | "true" | "1")),
            sort: self
                .sort
                .as_deref()
                .and_then(|s| ProductSort::from_str(s).ok())
                .unwrap_or_default(),
        }
    }
}

/// A filter `<option>`.
#[derive(Clone)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Catalog listing template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogTemplate {
    pub ctx: PageContext,
    pub heading: String,
    pub action: String,
    pub products: Vec<ProductCard>,
    pub sizes: Vec<FilterOption>,
    pub sorts: Vec<FilterOption>,
    pub max_price: String,
    pub in_stock_only: bool,
}

/// All products.
#[instrument(skip(state, ctx))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse> {
    render(&state, ctx, &query, None).await
}

/// Men's department.
#[instrument(skip(state, ctx))]
pub async fn men(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse> {
    render(&state, ctx, &query, Some(Category::Men)).await
}

/// Women's department.
#[instrument(skip(state, ctx))]
pub async fn women(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse> {
    render(&state, ctx, &query, Some(Category::Women)).await
}

/// Kids' and babies' department.
#[instrument(skip(state, ctx))]
pub async fn kids(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse> {
    render(&state, ctx, &query, Some(Category::Kids)).await
}

async fn render(
    state: &AppState,
    ctx: PageContext,
    query: &CatalogQuery,
    category: Option<Category>,
) -> Result<CatalogTemplate> {
    let currency = state.checkout().currency;
    let products = state.backend().list_products().await?;
    let filter = query.to_filter(category);

    // Size choices come from the whole department, not the filtered subset,
    // so picking a size never hides the other choices.
    let in_department: Vec<&Product> = products
        .iter()
        .filter(|p| category.is_none_or(|c| p.category == c))
        .collect();
    let sizes = size_options(&in_department, filter.size.as_deref());

    let cards = filter
        .apply(&products)
        .into_iter()
        .map(|p| ProductCard::new(p, currency))
        .collect();

    let (heading, action) = category.map_or_else(
        || ("Catálogo".to_string(), "/catalog".to_string()),
        |c| (c.label().to_string(), format!("/{}", c.slug())),
    );

    Ok(CatalogTemplate {
        ctx,
        heading,
        action,
        products: cards,
        sizes,
        sorts: sort_options(filter.sort),
        max_price: filter.max_price.map(|m| m.to_string()).unwrap_or_default(),
        in_stock_only: filter.in_stock_only,
    })
}

fn size_options(products: &[&Product], selected: Option<&str>) -> Vec<FilterOption> {
    let mut seen = HashSet::new();
    products
        .iter()
        .flat_map(|p| p.sizes())
        .filter(|size| seen.insert(size.trim().to_lowercase()))
        .map(|size| FilterOption {
            value: size.to_owned(),
            label: size.to_owned(),
            selected: selected.is_some_and(|s| s.eq_ignore_ascii_case(size.trim())),
        })
        .collect()
}

fn sort_options(current: ProductSort) -> Vec<FilterOption> {
    [
        (ProductSort::Featured, "Destacados"),
        (ProductSort::PriceAsc, "Precio: menor a mayor"),
        (ProductSort::PriceDesc, "Precio: mayor a menor"),
        (ProductSort::Name, "Nombre"),
    ]
    .into_iter()
    .map(|(sort, label)| FilterOption {
        value: sort.as_str().to_string(),
        label: label.to_string(),
        selected: sort == current,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_to_filter() {
        let query = CatalogQuery {
            size: Some(" M ".to_string()),
            max_price: Some("80000".to_string()),
            in_stock: Some("on".to_string()),
            sort: Some("price-desc".to_string()),
        };
        let filter = query.to_filter(Some(Category::Women));
        assert_eq!(filter.category, Some(Category::Women));
        assert_eq!(filter.size.as_deref(), Some("M"));
        assert_eq!(filter.max_price, Some(Decimal::new(80_000, 0)));
        assert!(filter.in_stock_only);
        assert_eq!(filter.sort, ProductSort::PriceDesc);
    }

    #[test]
    fn test_garbage_query_is_ignored() {
        let query = CatalogQuery {
            size: Some("   ".to_string()),
            max_price: Some("cheap".to_string()),
            in_stock: None,
            sort: Some("random".to_string()),
        };
        assert_eq!(query.to_filter(None), ProductFilter::default());
    }

    #[test]
    fn test_negative_max_price_is_ignored() {
        let query = CatalogQuery {
            max_price: Some("-5".to_string()),
            ..CatalogQuery::default()
        };
        assert!(query.to_filter(None).max_price.is_none());
    }
}
