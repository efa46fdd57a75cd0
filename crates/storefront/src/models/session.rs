//! Session-related types.
//!
//! Everything the storefront remembers about a visitor lives in the
//! tower-sessions session under the keys below.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Session keys.
pub mod keys {
    /// The signed-in user, as returned by the backend.
    pub const CURRENT_USER: &str = "current_user";

    /// Backend auth cookie relayed on authenticated calls.
    pub const BACKEND_COOKIE: &str = "backend_cookie";

    /// The shopping cart (JSON array of lines).
    pub const CART: &str = "webcommerce_cart";

    /// One-shot message shown on the next rendered page.
    pub const FLASH: &str = "flash";
}

/// Flash message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// A one-shot message carried across a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    /// CSS modifier for the flash banner.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.kind {
            FlashKind::Success => "flash--success",
            FlashKind::Error => "flash--error",
        }
    }

    /// Store the message for the next page. Failures are logged, not fatal.
    pub async fn push(self, session: &Session) {
        if let Err(e) = session.insert(keys::FLASH, self).await {
            tracing::warn!(error = %e, "Failed to store flash message");
        }
    }

    /// Remove and return the pending message, if any.
    pub async fn take(session: &Session) -> Option<Self> {
        session.remove::<Self>(keys::FLASH).await.ok().flatten()
    }
}
