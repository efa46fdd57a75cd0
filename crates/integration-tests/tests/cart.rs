//! Cart flows: variant matching, stock limits and line edits.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use webcommerce_integration_tests::{TestApp, camiseta};

#[tokio::test]
async fn test_add_to_cart_matches_variant() {
    let mut app = TestApp::spawn().await;
    app.mock_product(&camiseta()).await;

    let response = app.add_camiseta("2").await;
    assert_eq!(response.redirect_target(), "/cart");

    let page = app.get("/cart").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Camiseta Básica se agregó al carrito"));
    assert!(page.body.contains("CAM-01-M-ROJO"));
    assert!(page.body.contains(r#"<span class="badge">2</span>"#));
}

#[tokio::test]
async fn test_adding_same_variant_merges_lines() {
    let mut app = TestApp::spawn().await;
    app.mock_product(&camiseta()).await;

    app.add_camiseta("1").await.redirect_target();
    // Case differences in size and color address the same line
    let response = app
        .post_form(
            "/cart/add",
            &[
                ("product_id", "p1"),
                ("size", "m"),
                ("color", "rojo"),
                ("quantity", "1"),
            ],
        )
        .await;
    assert_eq!(response.redirect_target(), "/cart");

    let page = app.get("/cart").await;
    assert_eq!(page.body.matches("CAM-01-M-ROJO").count(), 1);
    assert!(page.body.contains(r#"<span class="badge">2</span>"#));
}

#[tokio::test]
async fn test_add_beyond_stock_is_refused() {
    let mut app = TestApp::spawn().await;
    app.mock_product(&camiseta()).await;

    app.add_camiseta("2").await.redirect_target();
    let response = app.add_camiseta("2").await;
    assert_eq!(response.redirect_target(), "/products/p1?size=M&color=Rojo");

    let page = app.get("/cart").await;
    assert!(page.body.contains("Solo puedes agregar 1 unidad(es) más"));
    assert!(page.body.contains(r#"<span class="badge">2</span>"#));
}

#[tokio::test]
async fn test_incomplete_and_sold_out_selections() {
    let mut app = TestApp::spawn().await;
    app.mock_product(&camiseta()).await;

    let response = app
        .post_form("/cart/add", &[("product_id", "p1"), ("color", "Rojo")])
        .await;
    assert_eq!(response.redirect_target(), "/products/p1?color=Rojo");
    let page = app.get("/cart").await;
    assert!(page.body.contains("Selecciona una talla y un color"));

    let response = app
        .post_form(
            "/cart/add",
            &[("product_id", "p1"), ("size", "L"), ("color", "Rojo")],
        )
        .await;
    assert_eq!(response.redirect_target(), "/products/p1?size=L&color=Rojo");
    let page = app.get("/cart").await;
    assert!(page.body.contains("Esa combinación está agotada"));
    assert!(page.body.contains("Tu carrito está vacío"));
}

#[tokio::test]
async fn test_update_remove_and_clear() {
    let mut app = TestApp::spawn().await;
    app.mock_product(&camiseta()).await;
    app.add_camiseta("1").await.redirect_target();

    let response = app
        .post_form("/cart/update", &[("key", "p1|m|rojo"), ("quantity", "3")])
        .await;
    assert_eq!(response.redirect_target(), "/cart");
    let page = app.get("/cart").await;
    assert!(page.body.contains(r#"<span class="badge">3</span>"#));

    // Only three red M shirts exist
    let response = app
        .post_form("/cart/update", &[("key", "p1|m|rojo"), ("quantity", "4")])
        .await;
    assert_eq!(response.redirect_target(), "/cart");
    let page = app.get("/cart").await;
    assert!(page.body.contains("Ya tienes en el carrito todas las unidades disponibles"));

    let response = app
        .post_form("/cart/update", &[("key", "p1|m|rojo"), ("quantity", "0")])
        .await;
    assert_eq!(response.redirect_target(), "/cart");
    let page = app.get("/cart").await;
    assert!(page.body.contains("Tu carrito está vacío"));

    app.add_camiseta("1").await.redirect_target();
    let response = app.post_form("/cart/remove", &[("key", "p1|m|rojo")]).await;
    assert_eq!(response.redirect_target(), "/cart");
    let page = app.get("/cart").await;
    assert!(page.body.contains("Camiseta Básica se eliminó del carrito"));

    app.add_camiseta("1").await.redirect_target();
    let response = app.post_form("/cart/clear", &[]).await;
    assert_eq!(response.redirect_target(), "/cart");
    let page = app.get("/cart").await;
    assert!(page.body.contains("Vaciaste tu carrito"));
    assert!(page.body.contains(r#"<span class="badge">0</span>"#));
}

#[tokio::test]
async fn test_removing_unknown_line() {
    let mut app = TestApp::spawn().await;

    let response = app.post_form("/cart/remove", &[("key", "nope|m|rojo")]).await;
    assert_eq!(response.redirect_target(), "/cart");
    let page = app.get("/cart").await;
    assert!(page.body.contains("Ese producto ya no está en tu carrito"));
}

#[tokio::test]
async fn test_typed_quantities_come_back_as_messages() {
    let mut app = TestApp::spawn().await;
    app.mock_product(&camiseta()).await;

    // A blank quantity adds one unit
    app.add_camiseta("").await.redirect_target();
    let page = app.get("/cart").await;
    assert!(page.body.contains(r#"<span class="badge">1</span>"#));

    let response = app.add_camiseta("-2").await;
    assert_eq!(response.redirect_target(), "/products/p1?size=M&color=Rojo");
    let page = app.get("/cart").await;
    assert!(page.body.contains("La cantidad debe ser al menos 1"));

    let response = app
        .post_form("/cart/update", &[("key", "p1|m|rojo"), ("quantity", "dos")])
        .await;
    assert_eq!(response.redirect_target(), "/cart");
    let page = app.get("/cart").await;
    assert!(page.body.contains("La cantidad debe ser al menos 1"));
    assert!(page.body.contains(r#"<span class="badge">1</span>"#));
}
