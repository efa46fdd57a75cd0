//! Admin console: overview, product management and order management.
//!
//! Every handler takes [`RequireAdmin`], which also carries the backend
//! cookie the admin API calls need.

pub mod orders;
pub mod products;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::instrument;
use webcommerce_core::{OrderStatus, Product};

use crate::backend::OrderQuery;
use crate::error::Result;
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin};
use crate::state::AppState;

use self::orders::OrderRow;

/// Products at or below this many units are listed as running low.
const LOW_STOCK_THRESHOLD: u64 = 5;

/// A product that needs restocking.
#[derive(Debug, Clone)]
pub struct LowStockRow {
    pub id: String,
    pub name: String,
    pub stock: u64,
}

/// Admin overview template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminIndexTemplate {
    pub ctx: PageContext,
    pub product_count: usize,
    pub total_stock: u64,
    pub low_stock: Vec<LowStockRow>,
    pub order_count: u64,
    pub pending_count: u64,
    pub recent_orders: Vec<OrderRow>,
}

/// Build the admin router (mounted under `/admin`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/products", get(products::index).post(products::create))
        .route("/products/new", get(products::new))
        .route("/products/{id}", post(products::update))
        .route("/products/{id}/edit", get(products::edit))
        .route("/products/{id}/delete", post(products::delete))
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/orders/{id}/delete", post(orders::delete))
}

/// Admin overview handler.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ctx: PageContext,
) -> Result<impl IntoResponse> {
    let backend = state.backend();
    let recent = OrderQuery {
        limit: 5,
        ..OrderQuery::default()
    };
    let pending = OrderQuery {
        limit: 1,
        status: Some(OrderStatus::Pending),
        ..OrderQuery::default()
    };

    let (products, recent, pending) = tokio::try_join!(
        backend.list_products(),
        backend.list_orders(&recent, &admin.cookie),
        backend.list_orders(&pending, &admin.cookie),
    )?;

    let currency = state.checkout().currency;
    let mut low_stock: Vec<LowStockRow> = products
        .iter()
        .filter(|p| p.total_stock() <= LOW_STOCK_THRESHOLD)
        .map(|p| LowStockRow {
            id: p.id.to_string(),
            name: p.name.clone(),
            stock: p.total_stock(),
        })
        .collect();
    low_stock.sort_by_key(|row| row.stock);

    Ok(AdminIndexTemplate {
        ctx,
        product_count: products.len(),
        total_stock: products.iter().map(Product::total_stock).sum(),
        low_stock,
        order_count: recent.total,
        pending_count: pending.total,
        recent_orders: recent
            .orders
            .iter()
            .map(|o| OrderRow::new(o, currency))
            .collect(),
    })
}
