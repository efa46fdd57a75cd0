//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check (session database)
//!
//! # Catalog
//! GET  /catalog                   - All products (?size&max_price&in_stock&sort)
//! GET  /men, /women, /kids        - Department pages (same filters)
//! GET  /products/{id}             - Product detail (?size&color)
//!
//! # Cart
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add a size/color variant
//! POST /cart/update               - Change a line's quantity (0 removes)
//! POST /cart/remove               - Remove a line
//! POST /cart/clear                - Empty the cart
//!
//! # Checkout
//! GET  /checkout                  - Shipping form and totals
//! POST /checkout                  - Place the order
//! GET  /order-confirmation/{id}   - Confirmation
//!
//! # Auth (rate limited)
//! GET  /auth/login                - Login page
//! POST /auth/login                - Login action
//! GET  /auth/register             - Register page
//! POST /auth/register             - Register action
//! POST /auth/logout               - Logout action
//!
//! # Account (requires auth)
//! GET  /dashboard                 - Signed-in overview
//!
//! # Admin (requires admin role)
//! GET  /admin                     - Overview
//! GET  /admin/products            - Product table
//! GET  /admin/products/new        - Create form
//! POST /admin/products            - Create
//! GET  /admin/products/{id}/edit  - Edit form
//! POST /admin/products/{id}       - Update
//! POST /admin/products/{id}/delete
//! GET  /admin/orders              - Order list (?page&limit&status)
//! GET  /admin/orders/{id}         - Order detail
//! POST /admin/orders/{id}/status  - Change status
//! POST /admin/orders/{id}/delete
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod dashboard;
pub mod home;
pub mod products;
pub mod views;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home and health
        .route("/", get(home::home))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        // Catalog
        .route("/catalog", get(catalog::index))
        .route("/men", get(catalog::men))
        .route("/women", get(catalog::women))
        .route("/kids", get(catalog::kids))
        .route("/products/{id}", get(products::show))
        // Cart and checkout
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::place))
        .route("/order-confirmation/{id}", get(checkout::confirmation))
        // Accounts
        .nest("/auth", auth_routes())
        .route("/dashboard", get(dashboard::show))
        // Admin console
        .nest("/admin", admin::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the session database is reachable; 503 otherwise. Without a
/// database (in-memory sessions) the server is always ready.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
