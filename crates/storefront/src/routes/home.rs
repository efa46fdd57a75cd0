//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;
use webcommerce_core::Category;

use crate::filters;
use crate::middleware::PageContext;
use crate::routes::views::ProductCard;
use crate::state::AppState;

/// Number of products featured on the home page.
const FEATURED_COUNT: usize = 8;

/// A department tile.
#[derive(Clone)]
pub struct DepartmentLink {
    pub href: String,
    pub label: &'static str,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub featured: Vec<ProductCard>,
    pub departments: Vec<DepartmentLink>,
}

/// Display the home page.
///
/// A backend outage leaves the featured grid empty rather than failing the
/// landing page.
#[instrument(skip(state, ctx))]
pub async fn home(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    let currency = state.checkout().currency;
    let featured = match state.backend().list_products().await {
        Ok(products) => products
            .iter()
            .filter(|p| p.in_stock())
            .take(FEATURED_COUNT)
            .map(|p| ProductCard::new(p, currency))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch featured products");
            Vec::new()
        }
    };

    let departments = Category::DEPARTMENTS
        .into_iter()
        .map(|c| DepartmentLink {
            href: format!("/{}", c.slug()),
            label: c.label(),
        })
        .collect();

    HomeTemplate {
        ctx,
        featured,
        departments,
    }
}
