//! The signed-in account, as reported by the backend auth service.

use serde::{Deserialize, Serialize};

use crate::types::{UserId, UserRole};

/// A backend user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
}

impl User {
    /// Whether the account may use the admin console.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Name to greet the user with, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_role() {
        let user: User = serde_json::from_value(serde_json::json!({
            "_id": "u1",
            "name": "Admin",
            "email": "admin@example.com",
            "role": "admin"
        }))
        .unwrap();
        assert!(user.is_admin());
    }

    #[test]
    fn test_missing_role_is_regular_user() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "u2",
            "email": "ana@example.com"
        }))
        .unwrap();
        assert!(!user.is_admin());
        assert_eq!(user.display_name(), "ana@example.com");
    }
}
