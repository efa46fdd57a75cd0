//! Security headers for every storefront response.
//!
//! Pages are plain HTML forms with no scripts, so the content policy forbids
//! scripts outright and only opens `img-src` for remote product images.
//! Pages carry the visitor's cart and account, so they are never cached;
//! `/static` assets keep whatever caching the file service sets.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Content policy for server-rendered pages.
const CONTENT_POLICY: &str = "default-src 'none'; \
     script-src 'none'; \
     style-src 'self'; \
     font-src 'self'; \
     img-src 'self' https:; \
     connect-src 'none'; \
     frame-src 'none'; \
     object-src 'none'; \
     base-uri 'self'; \
     form-action 'self'; \
     frame-ancestors 'none'; \
     upgrade-insecure-requests";

/// Browser features the shop never needs.
const PERMISSIONS_POLICY: &str = "camera=(), \
     display-capture=(), \
     geolocation=(), \
     microphone=(), \
     payment=(), \
     publickey-credentials-get=(), \
     usb=(), \
     interest-cohort=(), \
     browsing-topics=()";

/// Headers set on every response, static assets included.
const ALWAYS: [(&str, &str); 4] = [
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "same-origin"),
    ("x-dns-prefetch-control", "off"),
];

/// Headers for rendered pages.
const PAGES: [(&str, &str); 6] = [
    ("content-security-policy", CONTENT_POLICY),
    ("permissions-policy", PERMISSIONS_POLICY),
    ("cache-control", "private, no-store"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    // Product images are hot-linked from hosts that send no CORP header
    ("cross-origin-embedder-policy", "credentialless"),
];

fn apply(headers: &mut HeaderMap, set: &[(&'static str, &'static str)]) {
    for &(name, value) in set {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
}

/// Add security headers to all responses.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let is_asset = request.uri().path().starts_with("/static/");
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    apply(headers, &ALWAYS);
    if !is_asset {
        apply(headers, &PAGES);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::header::{
        CACHE_CONTROL, CONTENT_SECURITY_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
    };
    use axum::{Router, body::Body, http, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/cart", get(|| async { "cart" }))
            .route("/static/css/main.css", get(|| async { "body {}" }))
            .layer(middleware::from_fn(security_headers_middleware))
    }

    async fn headers_for(uri: &str) -> HeaderMap {
        app()
            .oneshot(http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .headers()
            .clone()
    }

    #[tokio::test]
    async fn test_pages_forbid_scripts_and_caching() {
        let headers = headers_for("/cart").await;

        assert_eq!(headers[X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[CACHE_CONTROL], "private, no-store");
        let csp = headers[CONTENT_SECURITY_POLICY].to_str().unwrap();
        assert!(csp.contains("script-src 'none'"));
        assert!(csp.contains("img-src 'self' https:"));
        assert!(csp.contains("form-action 'self'"));
    }

    #[tokio::test]
    async fn test_assets_keep_their_caching() {
        let headers = headers_for("/static/css/main.css").await;

        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert!(headers.get(CACHE_CONTROL).is_none());
        assert!(headers.get(CONTENT_SECURITY_POLICY).is_none());
    }
}
