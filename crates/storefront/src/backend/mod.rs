//! Client for the Webcommerce backend REST API.
//!
//! # Architecture
//!
//! - The backend is the source of truth for products, orders and accounts;
//!   this crate never stores them locally
//! - JSON over HTTP via `reqwest`, every endpoint under `{BACKEND_URL}/api`
//! - Product reads are cached in memory via `moka`; mutations and new orders
//!   invalidate the cache because they change stock
//! - Authenticated calls forward the backend's own session cookie, captured
//!   at login and kept in the storefront session
//!
//! # Example
//!
//! ```rust,ignore
//! use webcommerce_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(&config.backend)?;
//! let products = client.list_products().await?;
//! let auth = client.login(&Credentials { email, password }).await?;
//! let orders = client.list_orders(&OrderQuery::default(), &auth.cookie).await?;
//! ```

mod cache;
mod client;
mod cookie;
pub mod types;

pub use client::BackendClient;
pub use cookie::BackendCookie;
pub use types::{AuthSession, Credentials, OrderQuery, Registration};

use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The request needs a signed-in user.
    #[error("Unauthorized")]
    Unauthorized,

    /// The signed-in user may not perform this action.
    #[error("Forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend refused the request with a reason meant for the user
    /// (insufficient stock, duplicate email, invalid data).
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response was valid JSON but not what the endpoint promises.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// The backend's own explanation, when it is safe to show to the user.
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Rejected(message) => Some(message),
            _ => None,
        }
    }

    /// Whether the backend session behind the request is gone.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Pull a human-readable message out of an error body.
///
/// The backend answers errors with `{"message": "..."}`, sometimes
/// `{"error": "..."}`; anything else is truncated raw text.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error", "msg"]
                .iter()
                .find_map(|key| value.get(key)?.as_str().map(str::to_owned))
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}
