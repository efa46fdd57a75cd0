//! Backend REST client implementation.
//!
//! Uses `reqwest` 0.13 for HTTP and caches catalog reads with `moka`.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::header::{ACCEPT, COOKIE, HeaderMap, RETRY_AFTER};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;
use webcommerce_core::{
    NewOrder, Order, OrderId, OrderPage, OrderStatus, Product, ProductId, User, ValidProduct,
};

use super::cache::{CacheKey, CacheValue};
use super::types::{
    AckEnvelope, AuthSession, Credentials, OrderEnvelope, OrderQuery, OrdersEnvelope,
    ProductEnvelope, ProductsEnvelope, Registration, StatusUpdate, UserEnvelope,
};
use super::{BackendCookie, BackendError, error_message};
use crate::config::BackendConfig;

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the Webcommerce backend API.
///
/// Cheap to clone; all clones share one connection pool and one cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    api_base: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the base URL
    /// cannot carry a path.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                api_base: api_base(&config.url)?,
                cache,
            }),
        })
    }

    /// URL for an API path, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.inner.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidUrl(self.inner.api_base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, cookie: Option<&BackendCookie>) -> RequestBuilder {
        let builder = self
            .inner
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");

        match cookie.and_then(BackendCookie::header_value) {
            Some(value) => builder.header(COOKIE, value),
            None => builder,
        }
    }

    /// Send a request and decode the JSON body, keeping the response headers.
    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<(HeaderMap, T), BackendError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let headers = response.headers().clone();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body);
            if status.is_server_error() {
                tracing::warn!(status = %status, message = %message, "Backend returned server error");
            } else {
                debug!(status = %status, message = %message, "Backend refused request");
            }

            return Err(match status {
                StatusCode::UNAUTHORIZED => BackendError::Unauthorized,
                StatusCode::FORBIDDEN => BackendError::Forbidden,
                StatusCode::NOT_FOUND => BackendError::NotFound(message),
                StatusCode::BAD_REQUEST
                | StatusCode::CONFLICT
                | StatusCode::UNPROCESSABLE_ENTITY => BackendError::Rejected(message),
                _ => BackendError::Status {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        // 204 and empty bodies decode as an empty object
        let text = if body.trim().is_empty() { "{}" } else { body.as_str() };

        match serde_json::from_str(text) {
            Ok(value) => Ok((headers, value)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "Failed to parse backend response"
                );
                Err(BackendError::Parse(e))
            }
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        self.execute(builder).await.map(|(_, body)| body)
    }

    /// Drop every cached catalog entry.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
        debug!("Catalog cache invalidated");
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List all products, in backend order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for product list");
            return Ok(products);
        }

        let url = self.endpoint(&["products"])?;
        let envelope: ProductsEnvelope = self.send(self.request(Method::GET, url, None)).await?;
        envelope.outcome.check()?;

        self.inner
            .cache
            .insert(
                CacheKey::Products,
                CacheValue::Products(envelope.products.clone()),
            )
            .await;

        Ok(envelope.products)
    }

    /// Get a product by ID, from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, BackendError> {
        if let Some(CacheValue::Product(product)) =
            self.inner.cache.get(&CacheKey::Product(id.clone())).await
        {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        self.fetch_product(id).await
    }

    /// Get a product by ID from the backend, bypassing and then refreshing
    /// the cache. Used wherever stock must be current, such as adding to
    /// the cart.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn fetch_product(&self, id: &ProductId) -> Result<Product, BackendError> {
        let url = self.endpoint(&["products", id.as_str()])?;
        let envelope: ProductEnvelope = self.send(self.request(Method::GET, url, None)).await?;
        envelope.outcome.check()?;

        let product = envelope
            .product
            .ok_or_else(|| BackendError::NotFound(format!("Product not found: {id}")))?;

        self.inner
            .cache
            .insert(
                CacheKey::Product(id.clone()),
                CacheValue::Product(Box::new(product.clone())),
            )
            .await;

        Ok(product)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the product or the user is
    /// not an admin.
    #[instrument(skip(self, product, cookie), fields(code = %product.code))]
    pub async fn create_product(
        &self,
        product: &ValidProduct,
        cookie: &BackendCookie,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["products"])?;
        let envelope: AckEnvelope = self
            .send(self.request(Method::POST, url, Some(cookie)).json(product))
            .await?;
        envelope.outcome.check()?;
        self.invalidate_catalog();
        Ok(())
    }

    /// Replace a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, product, cookie), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        product: &ValidProduct,
        cookie: &BackendCookie,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["products", id.as_str()])?;
        let envelope: AckEnvelope = self
            .send(self.request(Method::PUT, url, Some(cookie)).json(product))
            .await?;
        envelope.outcome.check()?;
        self.invalidate_catalog();
        Ok(())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, cookie), fields(product_id = %id))]
    pub async fn delete_product(
        &self,
        id: &ProductId,
        cookie: &BackendCookie,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["products", id.as_str()])?;
        let envelope: AckEnvelope = self
            .send(self.request(Method::DELETE, url, Some(cookie)))
            .await?;
        envelope.outcome.check()?;
        self.invalidate_catalog();
        Ok(())
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// List orders for the admin console.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the user is not an admin.
    #[instrument(skip(self, cookie))]
    pub async fn list_orders(
        &self,
        query: &OrderQuery,
        cookie: &BackendCookie,
    ) -> Result<OrderPage, BackendError> {
        let url = self.endpoint(&["orders"])?;
        let envelope: OrdersEnvelope = self
            .send(self.request(Method::GET, url, Some(cookie)).query(query))
            .await?;
        envelope.outcome.check()?;

        let total = envelope
            .total
            .unwrap_or_else(|| u64::try_from(envelope.orders.len()).unwrap_or(u64::MAX));

        Ok(OrderPage {
            orders: envelope.orders,
            page: envelope.page.unwrap_or(query.page).max(1),
            pages: envelope.pages.unwrap_or(1).max(1),
            total,
        })
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the order does not exist.
    #[instrument(skip(self, cookie), fields(order_id = %id))]
    pub async fn get_order(
        &self,
        id: &OrderId,
        cookie: Option<&BackendCookie>,
    ) -> Result<Order, BackendError> {
        let url = self.endpoint(&["orders", id.as_str()])?;
        let envelope: OrderEnvelope = self.send(self.request(Method::GET, url, cookie)).await?;
        envelope.outcome.check()?;
        envelope
            .order
            .ok_or_else(|| BackendError::NotFound(format!("Order not found: {id}")))
    }

    /// Place an order. Stock changes server-side, so the catalog cache is
    /// dropped on success.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Rejected` when the backend refuses the order
    /// (e.g. insufficient stock).
    #[instrument(skip(self, order, cookie), fields(items = order.items.len()))]
    pub async fn create_order(
        &self,
        order: &NewOrder,
        cookie: Option<&BackendCookie>,
    ) -> Result<Order, BackendError> {
        let url = self.endpoint(&["orders"])?;
        let envelope: OrderEnvelope = self
            .send(self.request(Method::POST, url, cookie).json(order))
            .await?;
        envelope.outcome.check()?;

        let created = envelope.order.ok_or_else(|| {
            BackendError::InvalidResponse("order missing from create response".to_string())
        })?;
        self.invalidate_catalog();
        Ok(created)
    }

    /// Request an order status change.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the transition.
    #[instrument(skip(self, cookie), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        cookie: &BackendCookie,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["orders", id.as_str(), "status"])?;
        let envelope: AckEnvelope = self
            .send(
                self.request(Method::PUT, url, Some(cookie))
                    .json(&StatusUpdate { status }),
            )
            .await?;
        envelope.outcome.check()
    }

    /// Delete an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, cookie), fields(order_id = %id))]
    pub async fn delete_order(
        &self,
        id: &OrderId,
        cookie: &BackendCookie,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["orders", id.as_str()])?;
        let envelope: AckEnvelope = self
            .send(self.request(Method::DELETE, url, Some(cookie)))
            .await?;
        envelope.outcome.check()
    }

    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Sign in and capture the backend session cookie.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Rejected` for bad credentials.
    #[instrument(skip(self, credentials))]
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthSession, BackendError> {
        let url = self.endpoint(&["auth", "login"])?;
        let result = self
            .execute::<UserEnvelope>(self.request(Method::POST, url, None).json(credentials))
            .await;

        match result {
            Ok((headers, envelope)) => auth_session(&headers, envelope),
            Err(BackendError::Unauthorized) => Err(BackendError::Rejected(
                "Correo o contraseña incorrectos".to_string(),
            )),
            Err(e) => Err(e),
        }
    }

    /// Create an account; the backend signs the new user in.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Rejected` if the email is taken or the data
    /// is invalid.
    #[instrument(skip(self, registration))]
    pub async fn register(&self, registration: &Registration) -> Result<AuthSession, BackendError> {
        let url = self.endpoint(&["auth", "register"])?;
        let (headers, envelope) = self
            .execute::<UserEnvelope>(self.request(Method::POST, url, None).json(registration))
            .await?;
        auth_session(&headers, envelope)
    }

    /// Fetch the profile behind a backend session cookie.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unauthorized` if the backend session expired.
    #[instrument(skip(self, cookie))]
    pub async fn profile(&self, cookie: &BackendCookie) -> Result<User, BackendError> {
        let url = self.endpoint(&["auth", "profile"])?;
        let envelope: UserEnvelope = self
            .send(self.request(Method::GET, url, Some(cookie)))
            .await?;
        envelope.outcome.check()?;
        envelope.user.ok_or(BackendError::Unauthorized)
    }

    /// End the backend session.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, cookie))]
    pub async fn logout(&self, cookie: &BackendCookie) -> Result<(), BackendError> {
        let url = self.endpoint(&["auth", "logout"])?;
        let envelope: AckEnvelope = self
            .send(self.request(Method::POST, url, Some(cookie)))
            .await?;
        envelope.outcome.check()
    }
}

/// `{BACKEND_URL}/api`, keeping any path prefix of the configured URL.
fn api_base(url: &Url) -> Result<Url, BackendError> {
    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    base.path_segments_mut()
        .map_err(|()| BackendError::InvalidUrl(url.to_string()))?
        .pop_if_empty()
        .push("api");
    Ok(base)
}

fn auth_session(headers: &HeaderMap, envelope: UserEnvelope) -> Result<AuthSession, BackendError> {
    envelope.outcome.check()?;
    let user = envelope.user.ok_or_else(|| {
        BackendError::InvalidResponse("user missing from auth response".to_string())
    })?;

    Ok(AuthSession {
        user,
        cookie: BackendCookie::from_headers(headers),
    })
}
