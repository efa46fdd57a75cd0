//! Admin order management: paged list with a status filter, detail view,
//! status changes and deletion.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use webcommerce_core::{Order, OrderId, OrderStatus};

use crate::backend::OrderQuery;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin};
use crate::models::Flash;
use crate::routes::views::{OrderView, StatusOption, money, status_options};
use crate::state::AppState;

/// Largest page size the list accepts.
const MAX_PAGE_SIZE: u32 = 50;

/// Query parameters of the order list (`?page&limit&status`).
#[derive(Debug, Default, Deserialize)]
pub struct OrdersParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Empty means every status.
    pub status: Option<String>,
}

impl OrdersParams {
    /// The backend query for these parameters. Unknown statuses list
    /// everything.
    #[must_use]
    pub fn to_query(&self) -> OrderQuery {
        let defaults = OrderQuery::default();
        OrderQuery {
            page: self.page.unwrap_or(defaults.page).max(1),
            limit: self.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE_SIZE),
            status: self.status.as_deref().and_then(|s| s.parse().ok()),
        }
    }
}

/// Status change form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// A row of the order table.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub id: String,
    pub reference: String,
    pub customer: String,
    pub created_at: String,
    pub items: u32,
    pub total: String,
    pub status: OrderStatus,
    pub status_label: &'static str,
}

impl OrderRow {
    #[must_use]
    pub fn new(order: &Order, currency: webcommerce_core::CurrencyCode) -> Self {
        Self {
            id: order.id.to_string(),
            reference: order.short_reference(),
            customer: order.shipping_address.full_name(),
            created_at: order
                .created_at
                .map(|at| at.format("%d/%m/%Y").to_string())
                .unwrap_or_default(),
            items: order.item_count(),
            total: money(order.total_amount, currency),
            status: order.status,
            status_label: order.status.label(),
        }
    }
}

/// Orders list page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders/index.html")]
pub struct OrdersIndexTemplate {
    pub ctx: PageContext,
    pub orders: Vec<OrderRow>,
    pub statuses: Vec<StatusOption>,
    pub limit: u32,
    pub page: u32,
    pub pages: u32,
    pub total: u64,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders/show.html")]
pub struct OrderShowTemplate {
    pub ctx: PageContext,
    pub order: OrderView,
    pub statuses: Vec<StatusOption>,
}

/// Link to another page of the list, keeping the limit and filter.
fn page_href(query: &OrderQuery, page: u32) -> String {
    let mut params = url::form_urlencoded::Serializer::new(String::new());
    params.append_pair("page", &page.to_string());
    params.append_pair("limit", &query.limit.to_string());
    if let Some(status) = query.status {
        params.append_pair("status", status.as_str());
    }
    format!("/admin/orders?{}", params.finish())
}

/// Orders list page handler.
#[instrument(skip(state, admin, ctx))]
pub async fn index(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ctx: PageContext,
    Query(params): Query<OrdersParams>,
) -> Result<impl IntoResponse> {
    let query = params.to_query();
    let listing = state.backend().list_orders(&query, &admin.cookie).await?;
    let currency = state.checkout().currency;

    Ok(OrdersIndexTemplate {
        ctx,
        orders: listing
            .orders
            .iter()
            .map(|o| OrderRow::new(o, currency))
            .collect(),
        statuses: status_options(query.status),
        limit: query.limit,
        page: listing.page,
        pages: listing.pages,
        total: listing.total,
        prev_href: listing
            .has_prev()
            .then(|| page_href(&query, listing.page - 1)),
        next_href: listing
            .has_next()
            .then(|| page_href(&query, listing.page + 1)),
    })
}

/// Order detail page handler.
#[instrument(skip(state, admin, ctx))]
pub async fn show(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ctx: PageContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let order = state
        .backend()
        .get_order(&OrderId::new(id), Some(&admin.cookie))
        .await?;

    Ok(OrderShowTemplate {
        ctx,
        statuses: status_options(Some(order.status)),
        order: OrderView::new(&order, state.checkout().currency),
    })
}

/// Change an order's status.
#[instrument(skip(state, admin, session))]
pub async fn update_status(
    State(state): State<AppState>,
    admin: RequireAdmin,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Response> {
    let status: OrderStatus = form
        .status
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Estado desconocido: {}", form.status)))?;
    let id = OrderId::new(id);

    state
        .backend()
        .update_order_status(&id, status, &admin.cookie)
        .await?;

    add_breadcrumb(
        "admin",
        "Order status changed",
        Some([("order_id", id.as_str()), ("status", status.as_str())].as_slice()),
    );
    tracing::info!(order_id = %id, %status, admin = %admin.user.id, "Order status changed");
    Flash::success(format!("El pedido ahora está {}", status.label().to_lowercase()))
        .push(&session)
        .await;
    Ok(Redirect::to(&format!("/admin/orders/{id}")).into_response())
}

/// Delete an order.
#[instrument(skip(state, admin, session))]
pub async fn delete(
    State(state): State<AppState>,
    admin: RequireAdmin,
    session: Session,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = OrderId::new(id);
    state.backend().delete_order(&id, &admin.cookie).await?;
    tracing::info!(order_id = %id, admin = %admin.user.id, "Order deleted");
    Flash::success("Pedido eliminado").push(&session).await;
    Ok(Redirect::to("/admin/orders").into_response())
}
