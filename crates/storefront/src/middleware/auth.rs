//! Authentication extractors.
//!
//! The backend owns accounts. After a successful login the storefront keeps
//! the backend's user record and auth cookie in the visitor's session; these
//! extractors read them back.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use webcommerce_core::User;

use crate::backend::{AuthSession, BackendCookie};
use crate::cart_store::load_cart;
use crate::error::AppError;
use crate::models::{Flash, session_keys};

/// Extractor that requires a signed-in user.
///
/// If nobody is signed in, redirects to the login page with a `next`
/// parameter pointing back at the requested page.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hola, {}", user.display_name())
/// }
/// ```
pub struct RequireAuth(pub User);

/// Extractor that requires a signed-in admin.
///
/// Carries the backend cookie, which every admin API call needs.
pub struct RequireAdmin {
    pub user: User,
    pub cookie: BackendCookie,
}

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<User>);

/// Error returned when a guard rejects the request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Not signed in; redirect to login and come back to `next`.
    RedirectToLogin { next: String },
    /// Signed in without the admin role.
    Forbidden,
    /// The session layer is missing from the router.
    MissingSession,
}

impl AuthRejection {
    fn login(parts: &Parts) -> Self {
        // Nested routers see the URI with their prefix stripped
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);
        let next = uri
            .path_and_query()
            .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned());
        Self::RedirectToLogin { next }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => {
                let query: String = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("next", &next)
                    .finish();
                Redirect::to(&format!("/auth/login?{query}")).into_response()
            }
            Self::Forbidden => {
                AppError::Forbidden("Esta sección es solo para administradores".to_string())
                    .into_response()
            }
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

fn session(parts: &Parts) -> Result<&Session, AuthRejection> {
    parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::MissingSession)
}

async fn current_user(session: &Session) -> Option<User> {
    session
        .get::<User>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// The backend cookie saved at login, if any.
pub async fn backend_cookie(session: &Session) -> Option<BackendCookie> {
    session
        .get::<BackendCookie>(session_keys::BACKEND_COOKIE)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session(parts)?;
        let user = current_user(session)
            .await
            .ok_or_else(|| AuthRejection::login(parts))?;
        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session(parts)?;
        let user = current_user(session)
            .await
            .ok_or_else(|| AuthRejection::login(parts))?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, "Non-admin user tried to open the admin console");
            return Err(AuthRejection::Forbidden);
        }
        // Without the cookie every admin call would fail; sign in again.
        let cookie = backend_cookie(session)
            .await
            .ok_or_else(|| AuthRejection::login(parts))?;
        Ok(Self { user, cookie })
    }
}

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };
        Ok(Self(user))
    }
}

/// What every rendered page shows in its header: the signed-in user, the
/// cart badge and a pending flash message (consumed on extraction).
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<User>,
    pub cart_count: u32,
    pub flash: Option<Flash>,
}

impl PageContext {
    /// Whether the admin link should be shown.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self::default());
        };
        Ok(Self {
            user: current_user(session).await,
            cart_count: load_cart(session).await.total_items(),
            flash: Flash::take(session).await,
        })
    }
}

/// Record a successful login or registration in the session.
///
/// The session ID is rotated first so a pre-login ID cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    auth: &AuthSession,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, &auth.user).await?;
    match &auth.cookie {
        Some(cookie) => session.insert(session_keys::BACKEND_COOKIE, cookie).await?,
        None => {
            session
                .remove::<BackendCookie>(session_keys::BACKEND_COOKIE)
                .await?;
        }
    }
    Ok(())
}

/// Forget the signed-in user (logout). The cart stays.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<User>(session_keys::CURRENT_USER).await?;
    session
        .remove::<BackendCookie>(session_keys::BACKEND_COOKIE)
        .await?;
    session.cycle_id().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Request, header::LOCATION};
    use tower_sessions::MemoryStore;
    use webcommerce_core::{UserId, UserRole};

    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: UserId::new("u1"),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            role,
        }
    }

    fn parts_with(session: &Session, uri: &str) -> Parts {
        let (mut parts, ()) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        parts.extensions.insert(session.clone());
        parts
    }

    fn new_session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    async fn sign_in(session: &Session, role: UserRole, cookie: Option<&str>) {
        let auth = AuthSession {
            user: user(role),
            cookie: cookie.map(BackendCookie::new),
        };
        set_current_user(session, &auth).await.unwrap();
    }

    #[tokio::test]
    async fn test_require_auth_redirects_with_next() {
        let session = new_session();
        let mut parts = parts_with(&session, "/dashboard?tab=orders");
        let rejection = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();

        let response = rejection.into_response();
        assert_eq!(
            response.headers()[LOCATION],
            "/auth/login?next=%2Fdashboard%3Ftab%3Dorders"
        );
    }

    #[tokio::test]
    async fn test_login_redirect_keeps_nest_prefix() {
        let session = new_session();
        // Inside the `/admin` nest the router sees only `/orders`
        let mut parts = parts_with(&session, "/orders?status=Pending");
        parts
            .extensions
            .insert(OriginalUri("/admin/orders?status=Pending".parse().unwrap()));

        let rejection = RequireAdmin::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(
            rejection.into_response().headers()[LOCATION],
            "/auth/login?next=%2Fadmin%2Forders%3Fstatus%3DPending"
        );
    }

    #[tokio::test]
    async fn test_require_admin_rejects_customers() {
        let session = new_session();
        sign_in(&session, UserRole::User, Some("token=abc")).await;

        let mut parts = parts_with(&session, "/admin");
        let rejection = RequireAdmin::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert!(matches!(rejection, AuthRejection::Forbidden));
    }

    #[tokio::test]
    async fn test_require_admin_needs_backend_cookie() {
        let session = new_session();
        sign_in(&session, UserRole::Admin, None).await;

        let mut parts = parts_with(&session, "/admin");
        let rejection = RequireAdmin::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert!(matches!(rejection, AuthRejection::RedirectToLogin { .. }));
    }

    #[tokio::test]
    async fn test_admin_signed_in() {
        let session = new_session();
        sign_in(&session, UserRole::Admin, Some("token=abc")).await;

        let mut parts = parts_with(&session, "/admin");
        let admin = RequireAdmin::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(admin.user.is_admin());
        assert_eq!(admin.cookie, BackendCookie::new("token=abc"));
    }

    #[tokio::test]
    async fn test_logout_forgets_user() {
        let session = new_session();
        sign_in(&session, UserRole::User, Some("token=abc")).await;
        clear_current_user(&session).await.unwrap();

        let mut parts = parts_with(&session, "/");
        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(user.is_none());
        assert!(backend_cookie(&session).await.is_none());
    }

    #[tokio::test]
    async fn test_page_context_consumes_flash() {
        let session = new_session();
        Flash::error("Sin stock").push(&session).await;

        let mut parts = parts_with(&session, "/cart");
        let ctx = PageContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(ctx.flash.as_ref().unwrap().message, "Sin stock");
        assert_eq!(ctx.cart_count, 0);
        assert!(!ctx.is_admin());

        let ctx = PageContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(ctx.flash.is_none());
    }
}
