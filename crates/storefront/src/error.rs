//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error;
use webcommerce_core::{CartError, CatalogError, OrderError, SelectionError};

use crate::backend::BackendError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend API call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Cart state transition refused.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Size/color selection cannot be bought.
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    /// Checkout data invalid.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Admin product form invalid.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Standalone error page; rendered without the site layout so it cannot
/// fail for the same reason the request did.
#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    status: u16,
    title: &'a str,
    message: &'a str,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Backend(err) => match err {
                BackendError::Unauthorized => StatusCode::UNAUTHORIZED,
                BackendError::Forbidden => StatusCode::FORBIDDEN,
                BackendError::NotFound(_) => StatusCode::NOT_FOUND,
                BackendError::Rejected(_) => StatusCode::BAD_REQUEST,
                BackendError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                BackendError::Http(_)
                | BackendError::Parse(_)
                | BackendError::Status { .. }
                | BackendError::InvalidResponse(_)
                | BackendError::InvalidUrl(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Cart(CartError::LineNotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Cart(_) | Self::Selection(_) | Self::Order(_) | Self::Catalog(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to the shopper.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Session(_) | Self::Internal(_) => "Error interno del servidor".to_string(),
            Self::Backend(err) => match err {
                BackendError::Rejected(message) => message.clone(),
                BackendError::NotFound(_) => "No encontramos lo que buscabas".to_string(),
                BackendError::Forbidden => "No tienes permiso para esta acción".to_string(),
                BackendError::Unauthorized => "Inicia sesión para continuar".to_string(),
                BackendError::RateLimited(_) => {
                    "Demasiadas solicitudes, intenta de nuevo en un momento".to_string()
                }
                _ => "El servicio de la tienda no está disponible".to_string(),
            },
            Self::Cart(err) => cart_message(err),
            Self::Selection(err) => selection_message(err),
            Self::Order(err) => order_message(err),
            Self::Catalog(err) => catalog_message(err),
            Self::NotFound(_) => "No encontramos lo que buscabas".to_string(),
            Self::Unauthorized(msg) | Self::Forbidden(msg) | Self::BadRequest(msg) => msg.clone(),
        }
    }

    /// Whether the shopper can fix this by changing their input, so the
    /// page should show a flash message instead of an error page.
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        self.status().is_client_error()
            && !matches!(
                self,
                Self::Backend(BackendError::Unauthorized | BackendError::RateLimited(_))
            )
    }

    fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // The backend session behind this visitor expired
        if matches!(self, Self::Backend(BackendError::Unauthorized)) {
            return Redirect::to("/auth/login").into_response();
        }

        let status = self.status();
        let message = self.public_message();
        let page = ErrorTemplate {
            status: status.as_u16(),
            title: status.canonical_reason().unwrap_or("Error"),
            message: &message,
        };

        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(_) => (status, message).into_response(),
        }
    }
}

fn cart_message(err: &CartError) -> String {
    match err {
        CartError::ZeroQuantity => "La cantidad debe ser al menos 1".to_string(),
        CartError::LineNotFound(_) => "Ese producto ya no está en tu carrito".to_string(),
    }
}

fn selection_message(err: &SelectionError) -> String {
    match err {
        SelectionError::Incomplete => "Selecciona una talla y un color".to_string(),
        SelectionError::Unavailable => "Esa combinación de talla y color no existe".to_string(),
        SelectionError::SoldOut => "Esa combinación está agotada".to_string(),
        SelectionError::ZeroQuantity => "La cantidad debe ser al menos 1".to_string(),
        SelectionError::InsufficientStock { available: 0 } => {
            "Ya tienes en el carrito todas las unidades disponibles".to_string()
        }
        SelectionError::InsufficientStock { available } => {
            format!("Solo puedes agregar {available} unidad(es) más")
        }
    }
}

fn order_message(err: &OrderError) -> String {
    match err {
        OrderError::MissingField(field) => {
            let label = match *field {
                "first name" => "nombre",
                "last name" => "apellido",
                "email" => "correo electrónico",
                "address" => "dirección",
                "city" => "ciudad",
                "state" => "departamento",
                "zip code" => "código postal",
                other => other,
            };
            format!("El campo {label} es obligatorio")
        }
        OrderError::InvalidEmail => "El correo electrónico no es válido".to_string(),
        OrderError::EmptyCart => "Tu carrito está vacío".to_string(),
    }
}

fn catalog_message(err: &CatalogError) -> String {
    match err {
        CatalogError::MissingName => "El nombre es obligatorio".to_string(),
        CatalogError::MissingCode => "El código es obligatorio".to_string(),
        CatalogError::NegativeCost => "El precio no puede ser negativo".to_string(),
        CatalogError::NoVariants => "Agrega al menos una variante de talla y color".to_string(),
        CatalogError::IncompleteVariant => {
            "Cada variante necesita talla y color".to_string()
        }
        CatalogError::DuplicateVariant { size, color } => {
            format!("La variante {size} / {color} está repetida")
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use axum::http::header::LOCATION;
    use webcommerce_core::LineKey;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Selection(SelectionError::SoldOut)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Cart(CartError::LineNotFound(LineKey::from_raw("x")))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Backend(BackendError::RateLimited(5))),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Backend(BackendError::InvalidResponse("x".to_string()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_expired_backend_session_redirects_to_login() {
        let response = AppError::Backend(BackendError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/auth/login");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("connection refused at 10.0.0.3".to_string());
        assert!(!err.public_message().contains("10.0.0.3"));

        let err = AppError::Backend(BackendError::Rejected("Stock insuficiente".to_string()));
        assert_eq!(err.public_message(), "Stock insuficiente");
    }

    #[test]
    fn test_domain_errors_are_translated() {
        let err = AppError::Order(OrderError::MissingField("zip code"));
        assert_eq!(err.public_message(), "El campo código postal es obligatorio");

        let err = AppError::Selection(SelectionError::InsufficientStock { available: 2 });
        assert_eq!(err.public_message(), "Solo puedes agregar 2 unidad(es) más");

        let err = AppError::Catalog(CatalogError::DuplicateVariant {
            size: "M".to_string(),
            color: "Rojo".to_string(),
        });
        assert_eq!(err.public_message(), "La variante M / Rojo está repetida");
    }
}
