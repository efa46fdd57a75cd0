//! Cart persistence.
//!
//! The cart is stored in the visitor's session under `webcommerce_cart` and
//! written back after every change, so a reload (or a new request on another
//! tab) always sees the latest state. Stored data is treated as untrusted:
//! rehydration goes through [`Cart::from_lines`], which repairs duplicate
//! keys and zero quantities.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;
use webcommerce_core::{Cart, CartLine};

use crate::error::AppError;
use crate::models::session_keys;

/// Load the visitor's cart. Missing or undecodable data yields an empty cart.
pub async fn load_cart(session: &Session) -> Cart {
    match session.get::<Vec<CartLine>>(session_keys::CART).await {
        Ok(Some(lines)) => Cart::from_lines(lines),
        Ok(None) => Cart::new(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored cart could not be read, starting empty");
            Cart::new()
        }
    }
}

/// Persist the cart.
///
/// # Errors
///
/// Returns an error if the session store rejects the write.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

/// The visitor's cart, bound to their session.
///
/// Every mutation goes through [`CartSession::update`], which loads the
/// stored cart, applies the change, and saves it before returning.
#[derive(Clone)]
pub struct CartSession {
    session: Session,
}

impl CartSession {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// The underlying session, for flash messages and auth state.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Current cart contents.
    pub async fn load(&self) -> Cart {
        load_cart(&self.session).await
    }

    /// Apply `change` to the stored cart and persist the result.
    ///
    /// Nothing is written when `change` fails.
    ///
    /// # Errors
    ///
    /// Returns the error from `change`, or a session error if saving fails.
    pub async fn update<T, E>(
        &self,
        change: impl FnOnce(&mut Cart) -> Result<T, E>,
    ) -> Result<T, AppError>
    where
        AppError: From<E>,
    {
        let mut cart = self.load().await;
        let outcome = change(&mut cart)?;
        save_cart(&self.session, &cart).await?;
        Ok(outcome)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns a session error if saving fails.
    pub async fn clear(&self) -> Result<(), AppError> {
        save_cart(&self.session, &Cart::new()).await?;
        Ok(())
    }
}

impl<S> FromRequestParts<S> for CartSession
where
    S: Send + Sync,
{
    type Rejection = <Session as FromRequestParts<S>>::Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Session::from_request_parts(parts, state).await.map(Self::new)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use tower_sessions::MemoryStore;
    use webcommerce_core::{CartError, ProductId, Sku};

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn line(product: &str, size: &str) -> CartLine {
        CartLine {
            product_id: ProductId::new(product),
            sku: Sku::new(format!("{product}-{size}")),
            name: "Jean".to_string(),
            size_name: size.to_string(),
            color_name: "Azul".to_string(),
            cost: Decimal::new(120_000, 0),
            quantity: 1,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_empty_session_has_empty_cart() {
        assert!(load_cart(&session()).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_persists_changes() {
        let carts = CartSession::new(session());
        carts
            .update(|cart| cart.add(line("p1", "32"), 2))
            .await
            .unwrap();
        carts
            .update(|cart| cart.add(line("p1", "32"), 1))
            .await
            .unwrap();

        let cart = carts.load().await;
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.subtotal(), Decimal::new(360_000, 0));
    }

    #[tokio::test]
    async fn test_failed_update_leaves_cart_untouched() {
        let carts = CartSession::new(session());
        carts
            .update(|cart| cart.add(line("p1", "32"), 1))
            .await
            .unwrap();

        let result = carts
            .update(|cart| {
                cart.clear();
                Err::<(), _>(CartError::ZeroQuantity)
            })
            .await;
        assert!(result.is_err());
        assert_eq!(carts.load().await.total_items(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let carts = CartSession::new(session());
        carts
            .update(|cart| cart.add(line("p1", "32"), 1))
            .await
            .unwrap();
        carts.clear().await.unwrap();
        assert!(carts.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_storage_is_repaired() {
        let session = session();
        let mut zero = line("p2", "30");
        zero.quantity = 0;
        session
            .insert(session_keys::CART, vec![line("p1", "32"), line("p1", "32"), zero])
            .await
            .unwrap();

        let cart = load_cart(&session).await;
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_items(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_storage_starts_empty() {
        let session = session();
        session
            .insert(session_keys::CART, serde_json::json!({"not": "a cart"}))
            .await
            .unwrap();
        assert!(load_cart(&session).await.is_empty());
    }
}
