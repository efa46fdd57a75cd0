//! Sign-in and the admin console guard.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;
use webcommerce_integration_tests::{BACKEND_TOKEN, TestApp, camiseta, order, user};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_login_lands_on_dashboard() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/profile"))
        .and(header("cookie", BACKEND_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "user": user("user"),
        })))
        .mount(&app.backend)
        .await;

    let response = app.login_as(&user("user")).await;
    assert_eq!(response.redirect_target(), "/dashboard");

    let page = app.get("/dashboard").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Hola de nuevo, Ana Gómez"));
    assert!(page.body.contains("ana@example.com"));
}

#[tokio::test]
async fn test_login_returns_to_next() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("{BACKEND_TOKEN}; Path=/"))
                .set_body_json(json!({ "success": true, "user": user("user") })),
        )
        .mount(&app.backend)
        .await;

    let response = app
        .post_form(
            "/auth/login",
            &[
                ("email", "ana@example.com"),
                ("password", "secreto123"),
                ("next", "/checkout"),
            ],
        )
        .await;
    assert_eq!(response.redirect_target(), "/checkout");
}

#[tokio::test]
async fn test_bad_credentials_rerender_form() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Invalid credentials",
        })))
        .mount(&app.backend)
        .await;

    let page = app
        .post_form(
            "/auth/login",
            &[("email", "ana@example.com"), ("password", "equivocada")],
        )
        .await;
    assert_eq!(page.status, StatusCode::BAD_REQUEST);
    assert!(page.body.contains("Correo o contraseña incorrectos"));
    assert!(page.body.contains(r#"value="ana@example.com""#));
}

#[tokio::test]
async fn test_register_checks_passwords_locally() {
    let mut app = TestApp::spawn().await;

    let page = app
        .post_form(
            "/auth/register",
            &[
                ("name", "Ana Gómez"),
                ("email", "ana@example.com"),
                ("password", "secreto123"),
                ("password_confirm", "secreto124"),
            ],
        )
        .await;
    assert_eq!(page.status, StatusCode::UNPROCESSABLE_ENTITY);
    // Nothing reached the backend
    assert!(app.backend.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_logout_keeps_cart() {
    let mut app = TestApp::spawn().await;
    app.mock_product(&camiseta()).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&app.backend)
        .await;

    app.login_as(&user("user")).await.redirect_target();
    app.add_camiseta("1").await.redirect_target();

    let response = app.post_form("/auth/logout", &[]).await;
    assert_eq!(response.redirect_target(), "/");

    let page = app.get("/cart").await;
    assert!(page.body.contains("Ingresar"));
    assert!(page.body.contains(r#"<span class="badge">1</span>"#));
}

// ============================================================================
// Admin guard
// ============================================================================

#[tokio::test]
async fn test_admin_requires_login() {
    let mut app = TestApp::spawn().await;

    let response = app.get("/admin/orders").await;
    assert_eq!(
        response.redirect_target(),
        "/auth/login?next=%2Fadmin%2Forders"
    );
}

#[tokio::test]
async fn test_admin_forbidden_for_customers() {
    let mut app = TestApp::spawn().await;
    app.login_as(&user("user")).await.redirect_target();

    let page = app.get("/admin").await;
    assert_eq!(page.status, StatusCode::FORBIDDEN);
    assert!(page.body.contains("Esta sección es solo para administradores"));
}

// ============================================================================
// Admin console
// ============================================================================

#[tokio::test]
async fn test_admin_order_list_forwards_backend_cookie() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .and(query_param("status", "Pending"))
        .and(header("cookie", BACKEND_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orders": [order("6651f0c2a9e4b7d3c1ab12f9")],
            "page": 1,
            "pages": 1,
            "total": 1,
        })))
        .expect(1)
        .mount(&app.backend)
        .await;

    let response = app.login_as(&user("admin")).await;
    assert_eq!(response.redirect_target(), "/admin");

    let page = app.get("/admin/orders?status=Pending").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("#AB12F9"));
    assert!(page.body.contains("Ana Gómez"));
}

#[tokio::test]
async fn test_admin_creates_product_with_skus() {
    let mut app = TestApp::spawn().await;
    app.mock_product(&camiseta()).await;
    Mock::given(method("POST"))
        .and(path("/api/products"))
        .and(header("cookie", BACKEND_TOKEN))
        .and(body_partial_json(json!({
            "name": "Polo Piqué",
            "code": "POL-02",
            "category": "men",
            "variants": [
                { "sizeName": "M", "colorName": "Blanco", "quantity": 4, "sku": "POL-02-M-BLANCO" },
                { "sizeName": "L", "colorName": "Negro", "quantity": 2, "sku": "POL-02-L-NEGRO" }
            ],
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true,
            "product": camiseta(),
        })))
        .expect(1)
        .mount(&app.backend)
        .await;

    app.login_as(&user("admin")).await.redirect_target();

    let response = app
        .post_form(
            "/admin/products",
            &[
                ("name", "Polo Piqué"),
                ("code", "POL-02"),
                ("cost", "79900"),
                ("category", "men"),
                ("description", ""),
                ("image", ""),
                ("variants", "m, Blanco, 4\nL, Negro, 2"),
            ],
        )
        .await;
    assert_eq!(response.redirect_target(), "/admin/products");

    let page = app.get("/admin/products").await;
    assert!(page.body.contains("Polo Piqué se creó"));
}

#[tokio::test]
async fn test_admin_product_form_reports_bad_lines() {
    let mut app = TestApp::spawn().await;
    app.login_as(&user("admin")).await.redirect_target();

    let page = app
        .post_form(
            "/admin/products",
            &[
                ("name", "Polo Piqué"),
                ("code", "POL-02"),
                ("cost", "79900"),
                ("category", "men"),
                ("variants", "M, Blanco, 4\nL, Negro"),
            ],
        )
        .await;
    assert_eq!(page.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(page.body.contains("Línea 2 de variantes"));
    // The form keeps what was typed
    assert!(page.body.contains("Polo Piqué"));
}

#[tokio::test]
async fn test_admin_overview_flags_low_stock() {
    let mut app = TestApp::spawn().await;
    app.mock_product(&camiseta()).await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orders": [order("6651f0c2a9e4b7d3c1ab12f9")],
            "page": 1,
            "pages": 1,
            "total": 1,
        })))
        .expect(2)
        .mount(&app.backend)
        .await;

    app.login_as(&user("admin")).await.redirect_target();

    let page = app.get("/admin").await;
    assert_eq!(page.status, StatusCode::OK);
    // Four units across all variants
    assert!(page.body.contains("Camiseta Básica</a> · 4 unidades"));
    assert!(page.body.contains("#AB12F9"));
}

#[tokio::test]
async fn test_admin_changes_order_status() {
    let mut app = TestApp::spawn().await;
    let id = "6651f0c2a9e4b7d3c1ab12f9";
    Mock::given(method("PUT"))
        .and(path(format!("/api/orders/{id}/status")))
        .and(header("cookie", BACKEND_TOKEN))
        .and(body_partial_json(json!({ "status": "Shipped" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/orders/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "order": order(id) })))
        .mount(&app.backend)
        .await;

    app.login_as(&user("admin")).await.redirect_target();

    // Status names are matched case-insensitively
    let response = app
        .post_form(&format!("/admin/orders/{id}/status"), &[("status", "shipped")])
        .await;
    assert_eq!(response.redirect_target(), format!("/admin/orders/{id}"));

    let page = app.get(&format!("/admin/orders/{id}")).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("El pedido ahora está enviado"));

    let page = app
        .post_form(&format!("/admin/orders/{id}/status"), &[("status", "Lost")])
        .await;
    assert_eq!(page.status, StatusCode::BAD_REQUEST);
    assert!(page.body.contains("Estado desconocido: Lost"));
}

#[tokio::test]
async fn test_admin_deletes_order() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("DELETE"))
        .and(path("/api/orders/6651f0c2a9e4b7d3c1ab12f9"))
        .and(header("cookie", BACKEND_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orders": [],
            "page": 1,
            "pages": 1,
            "total": 0,
        })))
        .mount(&app.backend)
        .await;

    app.login_as(&user("admin")).await.redirect_target();

    let response = app
        .post_form("/admin/orders/6651f0c2a9e4b7d3c1ab12f9/delete", &[])
        .await;
    assert_eq!(response.redirect_target(), "/admin/orders");

    let page = app.get("/admin/orders").await;
    assert!(page.body.contains("Pedido eliminado"));
}

#[tokio::test]
async fn test_admin_updates_product() {
    let mut app = TestApp::spawn().await;
    app.mock_product(&camiseta()).await;
    Mock::given(method("PUT"))
        .and(path("/api/products/p1"))
        .and(header("cookie", BACKEND_TOKEN))
        .and(body_partial_json(json!({
            "code": "CAM-01",
            "variants": [
                { "sizeName": "M", "colorName": "Rojo", "quantity": 5, "sku": "CAM-01-M-ROJO" }
            ],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "product": camiseta(),
        })))
        .expect(1)
        .mount(&app.backend)
        .await;

    app.login_as(&user("admin")).await.redirect_target();

    let response = app
        .post_form(
            "/admin/products/p1",
            &[
                ("name", "Camiseta Básica"),
                ("code", "CAM-01"),
                ("cost", "45000"),
                ("category", "men"),
                ("variants", "M, Rojo, 5"),
            ],
        )
        .await;
    assert_eq!(response.redirect_target(), "/admin/products");

    let page = app.get("/admin/products").await;
    assert!(page.body.contains("Camiseta Básica se actualizó"));
}

#[tokio::test]
async fn test_admin_deletes_product() {
    let mut app = TestApp::spawn().await;
    app.mock_product(&camiseta()).await;
    Mock::given(method("DELETE"))
        .and(path("/api/products/p1"))
        .and(header("cookie", BACKEND_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&app.backend)
        .await;

    app.login_as(&user("admin")).await.redirect_target();

    let response = app.post_form("/admin/products/p1/delete", &[]).await;
    assert_eq!(response.redirect_target(), "/admin/products");

    let page = app.get("/admin/products").await;
    assert!(page.body.contains("Producto eliminado"));
}
