//! End-to-end tests for the Webcommerce storefront.
//!
//! Each [`TestApp`] wires the real router to an in-memory session store and a
//! `wiremock` server standing in for the backend API, then drives it with
//! in-process requests. A small cookie jar carries the session between
//! requests the way a browser would.
//!
//! Run with: `cargo test -p webcommerce-integration-tests`

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use webcommerce_storefront::app;
use webcommerce_storefront::config::{BackendConfig, CheckoutConfig, StorefrontConfig};
use webcommerce_storefront::middleware::create_session_layer;
use webcommerce_storefront::middleware::session::SESSION_COOKIE_NAME;
use webcommerce_storefront::state::AppState;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Cookie the mocked backend issues on login.
pub const BACKEND_TOKEN: &str = "token=backend-session";

/// Client address sent with every request; the auth rate limiter keys on it.
const CLIENT_IP: &str = "203.0.113.7";

/// A response, fully buffered.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestResponse {
    /// Assert a post/redirect/get response and return its target.
    ///
    /// # Panics
    ///
    /// Panics if the response is not a 303 with a `Location`.
    pub fn redirect_target(&self) -> &str {
        assert_eq!(self.status, StatusCode::SEE_OTHER, "body: {}", self.body);
        self.location.as_deref().expect("redirect without Location")
    }
}

/// The storefront under test plus its mocked backend.
pub struct TestApp {
    pub backend: MockServer,
    router: Router,
    session_cookie: Option<String>,
}

impl TestApp {
    /// Start a mocked backend and build the storefront around it.
    ///
    /// # Panics
    ///
    /// Panics if the state cannot be built from the mock server's URL.
    pub async fn spawn() -> Self {
        let backend = MockServer::start().await;
        let config = StorefrontConfig {
            database_url: "postgres://unused".to_string().into(),
            host: [127, 0, 0, 1].into(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            backend: BackendConfig::new(&backend.uri()).expect("mock server URL"),
            checkout: CheckoutConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        };
        let state = AppState::new(config, None).expect("app state");
        let router = app(state, create_session_layer(MemoryStore::default(), false));

        Self {
            backend,
            router,
            session_cookie: None,
        }
    }

    /// Send a GET request.
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    /// Send a form POST.
    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let mut body = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in fields {
            body.append_pair(name, value);
        }
        self.send(Method::POST, uri, Some(body.finish())).await
    }

    async fn send(&mut self, method: Method, uri: &str, form: Option<String>) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", CLIENT_IP);
        if let Some(cookie) = &self.session_cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let request = match form {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body)),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };

        for value in response.headers().get_all(SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let pair = value.split(';').next().unwrap_or_default().trim();
            if pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")) {
                self.session_cookie = Some(pair.to_string());
            }
        }

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");

        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    /// Serve `product` from both the list and the detail endpoints.
    ///
    /// # Panics
    ///
    /// Panics if the fixture has no string `_id`.
    pub async fn mock_product(&self, product: &Value) {
        let id = product["_id"].as_str().expect("product fixture has an _id");

        Mock::given(method("GET"))
            .and(path(format!("/api/products/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "product": product,
            })))
            .mount(&self.backend)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "products": [product],
            })))
            .mount(&self.backend)
            .await;
    }

    /// Sign in as `user`; the backend accepts any credentials.
    pub async fn login_as(&mut self, user: &Value) -> TestResponse {
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", format!("{BACKEND_TOKEN}; Path=/; HttpOnly"))
                    .set_body_json(json!({ "success": true, "user": user })),
            )
            .mount(&self.backend)
            .await;

        let email = user["email"].as_str().unwrap_or("ana@example.com");
        self.post_form(
            "/auth/login",
            &[("email", email), ("password", "secreto123")],
        )
        .await
    }

    /// Put `quantity` units of the M/Rojo variant of [`camiseta`] in the cart.
    pub async fn add_camiseta(&mut self, quantity: &str) -> TestResponse {
        self.post_form(
            "/cart/add",
            &[
                ("product_id", "p1"),
                ("size", "M"),
                ("color", "Rojo"),
                ("quantity", quantity),
            ],
        )
        .await
    }
}

/// A shirt with three red M units, one blue M unit and a sold-out red L.
#[must_use]
pub fn camiseta() -> Value {
    json!({
        "_id": "p1",
        "name": "Camiseta Básica",
        "code": "CAM-01",
        "cost": 45000,
        "description": "Algodón peinado",
        "image": "https://cdn.example.com/cam-01.jpg",
        "category": "men",
        "variants": [
            { "sizeName": "M", "colorName": "Rojo", "quantity": 3, "sku": "CAM-01-M-ROJO" },
            { "sizeName": "M", "colorName": "Azul", "quantity": 1, "sku": "CAM-01-M-AZUL" },
            { "sizeName": "L", "colorName": "Rojo", "quantity": 0, "sku": "CAM-01-L-ROJO" }
        ]
    })
}

/// A backend user with the given role.
#[must_use]
pub fn user(role: &str) -> Value {
    json!({
        "_id": format!("u-{role}"),
        "name": "Ana Gómez",
        "email": "ana@example.com",
        "role": role,
    })
}

/// A placed order for two red M shirts.
#[must_use]
pub fn order(id: &str) -> Value {
    json!({
        "_id": id,
        "items": [{
            "productId": "p1",
            "sku": "CAM-01-M-ROJO",
            "name": "Camiseta Básica",
            "sizeName": "M",
            "colorName": "Rojo",
            "cost": 45000,
            "quantity": 2
        }],
        "shippingAddress": {
            "firstName": "Ana",
            "lastName": "Gómez",
            "email": "ana@example.com",
            "phone": "3001234567",
            "address": "Calle 10 # 5-20",
            "city": "Medellín",
            "state": "Antioquia",
            "zip": "050001"
        },
        "subtotal": 90000,
        "shippingCost": 5000,
        "taxAmount": 17100,
        "totalAmount": 112_100,
        "status": "Pending",
        "paymentMethod": "Credit Card (Simulated)",
        "createdAt": "2026-10-19T15:04:05Z"
    })
}

/// A complete shipping form.
#[must_use]
pub fn shipping_form() -> Vec<(&'static str, &'static str)> {
    vec![
        ("first_name", "Ana"),
        ("last_name", "Gómez"),
        ("email", "ana@example.com"),
        ("phone", "3001234567"),
        ("address", "Calle 10 # 5-20"),
        ("city", "Medellín"),
        ("state", "Antioquia"),
        ("zip", "050001"),
        ("notes", ""),
    ]
}
