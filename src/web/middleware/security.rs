//! Security headers middleware.

use axum::{
    body::Body,
    http::{header::HeaderValue, Request},
    middleware::Next,
    response::Response,
};

/// Security headers middleware.
///
/// Adds the following headers to all responses:
/// - X-Content-Type-Options: nosniff
/// - X-Frame-Options: DENY
/// - Referrer-Policy: strict-origin-when-cross-origin
/// - Cache-Control: no-store, unless the handler set one
///
/// API responses additionally get a sandboxing Content-Security-Policy, so a
/// previewed HTML or SVG upload cannot run script in the client's origin.
pub async fn security_headers(req: Request<Body>, next: Next) -> Response {
    let is_api = req.uri().path().starts_with("/api/");
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    if is_api {
        headers.insert(
            "Content-Security-Policy",
            HeaderValue::from_static("default-src 'none'; sandbox"),
        );
    }

    if !headers.contains_key("Cache-Control") {
        headers.insert(
            "Cache-Control",
            HeaderValue::from_static("no-store, max-age=0"),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::util::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "OK" }))
            .route("/api/health", get(|| async { "OK" }))
            .route(
                "/api/cached",
                get(|| async { ([("Cache-Control", "private, max-age=60")], "OK") }),
            )
            .layer(middleware::from_fn(security_headers))
    }

    async fn get_headers(uri: &str) -> axum::http::HeaderMap {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response.headers().clone()
    }

    #[tokio::test]
    async fn test_security_headers_added() {
        let headers = get_headers("/").await;
        assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
        assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
        assert_eq!(
            headers.get("Referrer-Policy").unwrap(),
            "strict-origin-when-cross-origin"
        );
        assert_eq!(headers.get("Cache-Control").unwrap(), "no-store, max-age=0");
        assert!(headers.get("Content-Security-Policy").is_none());
    }

    #[tokio::test]
    async fn test_api_responses_sandboxed() {
        let headers = get_headers("/api/health").await;
        assert_eq!(
            headers.get("Content-Security-Policy").unwrap(),
            "default-src 'none'; sandbox"
        );
    }

    #[tokio::test]
    async fn test_existing_cache_control_kept() {
        let headers = get_headers("/api/cached").await;
        assert_eq!(headers.get("Cache-Control").unwrap(), "private, max-age=60");
    }
}
