//! CORS layer configuration.

use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

const METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Create a CORS layer for the configured origins.
///
/// With no valid origins any origin is allowed, without credentials.
/// Download headers are exposed so browser clients can read the file name.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods(METHODS)
        .expose_headers([CONTENT_DISPOSITION, CONTENT_LENGTH]);

    if parsed_origins.is_empty() {
        layer.allow_headers(Any).allow_origin(Any)
    } else {
        layer
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
            .allow_credentials(true)
            .allow_origin(parsed_origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::util::ServiceExt;

    async fn preflight(layer: CorsLayer, origin: &str) -> axum::http::Response<Body> {
        let app = Router::new().route("/", get(|| async { "OK" })).layer(layer);
        app.oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/")
                .header("Origin", origin)
                .header("Access-Control-Request-Method", "PUT")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_any_origin_without_configuration() {
        let response = preflight(create_cors_layer(&[]), "http://example.com").await;
        assert_eq!(
            response.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_configured_origin_with_credentials() {
        let origins = vec!["http://localhost:5173".to_string()];
        let response = preflight(create_cors_layer(&origins), "http://localhost:5173").await;
        let headers = response.headers();
        assert_eq!(
            headers.get("Access-Control-Allow-Origin").unwrap(),
            "http://localhost:5173"
        );
        assert_eq!(
            headers.get("Access-Control-Allow-Credentials").unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_unlisted_origin_not_allowed() {
        let origins = vec!["http://localhost:5173".to_string()];
        let response = preflight(create_cors_layer(&origins), "http://evil.example").await;
        assert!(response
            .headers()
            .get("Access-Control-Allow-Origin")
            .is_none());
    }
}
