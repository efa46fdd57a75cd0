//! Request payloads and response envelopes for the backend API.

use std::fmt;

use serde::{Deserialize, Serialize};
use webcommerce_core::{Order, OrderStatus, Product, User};

use super::{BackendCookie, BackendError};

// =============================================================================
// Requests
// =============================================================================

/// Login payload.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Registration payload.
#[derive(Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Admin order listing query (`?page&limit&status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderQuery {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            status: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusUpdate {
    pub status: OrderStatus,
}

// =============================================================================
// Responses
// =============================================================================

/// A successful login or registration.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    /// Cookie to forward on authenticated calls; `None` if the backend set none.
    pub cookie: Option<BackendCookie>,
}

/// Fields shared by every backend envelope: `ok` (catalog) or `success`
/// (auth), plus an optional `message`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Outcome {
    #[serde(default)]
    ok: Option<bool>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
}

impl Outcome {
    /// Map an explicit `false` flag to a rejection.
    pub(crate) fn check(&self) -> Result<(), BackendError> {
        if self.ok == Some(false) || self.success == Some(false) {
            return Err(BackendError::Rejected(
                self.message
                    .clone()
                    .unwrap_or_else(|| "The request was rejected".to_string()),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductsEnvelope {
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductEnvelope {
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(default)]
    pub product: Option<Product>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrderEnvelope {
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(default)]
    pub order: Option<Order>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrdersEnvelope {
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserEnvelope {
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(default)]
    pub user: Option<User>,
}

/// Bodies of deletes, status updates and logout: only the outcome matters.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AckEnvelope {
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_false_is_rejected() {
        let envelope: ProductEnvelope =
            serde_json::from_str(r#"{"ok":false,"message":"Código duplicado"}"#).unwrap();
        let err = envelope.outcome.check().unwrap_err();
        assert_eq!(err.user_message(), Some("Código duplicado"));
    }

    #[test]
    fn test_success_false_is_rejected() {
        let envelope: UserEnvelope =
            serde_json::from_str(r#"{"success":false,"message":"Credenciales inválidas"}"#)
                .unwrap();
        assert!(envelope.outcome.check().is_err());
    }

    #[test]
    fn test_missing_flags_are_accepted() {
        let envelope: OrderEnvelope = serde_json::from_str(r#"{"order":null}"#).unwrap();
        assert!(envelope.outcome.check().is_ok());
        assert!(envelope.order.is_none());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let credentials = Credentials {
            email: "ana@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
        };
        let debug_output = format!("{credentials:?}");
        assert!(debug_output.contains("ana@example.com"));
        assert!(!debug_output.contains("hunter2"));
    }

    #[test]
    fn test_order_query_serialization() {
        let query = OrderQuery {
            page: 2,
            limit: 25,
            status: Some(OrderStatus::Shipped),
        };
        assert_eq!(
            serde_json::to_value(query).unwrap(),
            serde_json::json!({"page": 2, "limit": 25, "status": "Shipped"})
        );

        let all = serde_json::to_value(OrderQuery::default()).unwrap();
        assert!(all.get("status").is_none());
    }
}
