//! Authentication route handlers.
//!
//! Login and registration are relayed to the backend auth service. On
//! success the backend's user record and auth cookie are stored in the
//! session; nothing about passwords is kept here.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use webcommerce_core::{Email, User};

use crate::backend::{AuthSession, Credentials, Registration};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{PageContext, backend_cookie, clear_current_user, set_current_user};
use crate::models::Flash;
use crate::state::AppState;

/// Shortest password accepted at registration.
const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters of the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub email: String,
    pub next: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub name: String,
    pub email: String,
    pub error: Option<String>,
}

/// A post-login redirect target, accepted only if it stays on this site.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

/// Where a freshly signed-in user goes when no `next` was given.
fn landing_page(user: &User) -> &'static str {
    if user.is_admin() { "/admin" } else { "/dashboard" }
}

async fn start_session(session: &Session, auth: &AuthSession) -> Result<()> {
    set_current_user(session, auth).await?;
    set_sentry_user(&auth.user.id, Some(&auth.user.email));
    tracing::info!(user_id = %auth.user.id, "User signed in");
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(ctx: PageContext, Query(query): Query<LoginQuery>) -> impl IntoResponse {
    LoginTemplate {
        ctx,
        email: String::new(),
        next: safe_next(query.next.as_deref()).unwrap_or_default().to_owned(),
        error: None,
    }
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = safe_next(form.next.as_deref()).map(str::to_owned);
    let credentials = Credentials {
        email: form.email.trim().to_owned(),
        password: form.password,
    };

    match state.backend().login(&credentials).await {
        Ok(auth) => {
            start_session(&session, &auth).await?;
            Flash::success(format!("Hola de nuevo, {}", auth.user.display_name()))
                .push(&session)
                .await;
            let target = next.as_deref().unwrap_or_else(|| landing_page(&auth.user));
            Ok(Redirect::to(target).into_response())
        }
        Err(e) => {
            let e = AppError::from(e);
            if !e.is_user_correctable() {
                return Err(e);
            }
            tracing::info!(error = %e, "Login refused");
            let page = LoginTemplate {
                ctx,
                email: credentials.email,
                next: next.unwrap_or_default(),
                error: Some(e.public_message()),
            };
            Ok((e.status(), page).into_response())
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(ctx: PageContext) -> impl IntoResponse {
    RegisterTemplate {
        ctx,
        name: String::new(),
        email: String::new(),
        error: None,
    }
}

/// Check the registration form before it reaches the backend.
fn validate_registration(form: RegisterForm) -> std::result::Result<Registration, String> {
    let name = form.name.trim().to_owned();
    if name.is_empty() {
        return Err("El nombre es obligatorio".to_string());
    }
    let email = Email::parse(&form.email)
        .map_err(|_| "El correo electrónico no es válido".to_string())?;
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "La contraseña debe tener al menos {MIN_PASSWORD_LEN} caracteres"
        ));
    }
    if form.password != form.password_confirm {
        return Err("Las contraseñas no coinciden".to_string());
    }
    Ok(Registration {
        name,
        email: email.as_str().to_owned(),
        password: form.password,
    })
}

/// Handle registration form submission.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let (name, email) = (form.name.clone(), form.email.clone());
    let refused = |ctx: PageContext, error: String| {
        (
            axum::http::StatusCode::UNPROCESSABLE_ENTITY,
            RegisterTemplate {
                ctx,
                name: name.clone(),
                email: email.clone(),
                error: Some(error),
            },
        )
            .into_response()
    };

    let registration = match validate_registration(form) {
        Ok(registration) => registration,
        Err(message) => return Ok(refused(ctx, message)),
    };

    match state.backend().register(&registration).await {
        Ok(auth) => {
            start_session(&session, &auth).await?;
            Flash::success("Tu cuenta fue creada").push(&session).await;
            Ok(Redirect::to(landing_page(&auth.user)).into_response())
        }
        Err(e) => {
            let e = AppError::from(e);
            if e.is_user_correctable() {
                Ok(refused(ctx, e.public_message()))
            } else {
                Err(e)
            }
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out locally and at the backend. The cart is kept.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Response> {
    if let Some(cookie) = backend_cookie(&session).await
        && let Err(e) = state.backend().logout(&cookie).await
    {
        tracing::warn!(error = %e, "Backend logout failed");
    }

    clear_current_user(&session).await?;
    clear_sentry_user();
    Flash::success("Cerraste sesión").push(&session).await;
    Ok(Redirect::to("/").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            name: " Ana Gómez ".to_string(),
            email: "Ana@Example.com".to_string(),
            password: password.to_string(),
            password_confirm: confirm.to_string(),
        }
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/admin/orders?page=2")), Some("/admin/orders?page=2"));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }

    #[test]
    fn test_registration_validation() {
        let registration = validate_registration(form("secreto1", "secreto1"));
        let registration = registration.ok();
        assert_eq!(
            registration.as_ref().map(|r| r.name.as_str()),
            Some("Ana Gómez")
        );

        assert_eq!(
            validate_registration(form("corta", "corta")).err().as_deref(),
            Some("La contraseña debe tener al menos 6 caracteres")
        );
        assert_eq!(
            validate_registration(form("secreto1", "secreto2")).err().as_deref(),
            Some("Las contraseñas no coinciden")
        );
    }
}
