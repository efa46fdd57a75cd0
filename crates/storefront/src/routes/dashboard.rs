//! Signed-in user overview.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;
use webcommerce_core::User;

use crate::error::Result;
use crate::filters;
use crate::middleware::{PageContext, RequireAuth, backend_cookie};
use crate::state::AppState;

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub ctx: PageContext,
    pub user: User,
}

/// Display the dashboard.
///
/// The profile is re-read from the backend so role changes show up without
/// signing in again. An expired backend session sends the user to login.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ctx: PageContext,
    session: Session,
) -> Result<impl IntoResponse> {
    let user = match backend_cookie(&session).await {
        Some(cookie) => state.backend().profile(&cookie).await?,
        None => user,
    };
    Ok(DashboardTemplate { ctx, user })
}
