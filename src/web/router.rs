//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    create_folder, delete_file, delete_folder, download_file, folder_tree, health_check,
    list_files, list_folders, login, move_file, move_folder, preview_file, profile, register,
    rename_file, rename_folder, upload_files, AppState,
};
use super::middleware::{
    create_cors_layer, jwt_auth, login_rate_limit, register_rate_limit, security_headers,
    JwtState, RateLimitState,
};
use super::openapi::ApiDoc;
use crate::config::ServerConfig;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    rate_limits: Arc<RateLimitState>,
    config: &ServerConfig,
) -> Router {
    let login_limits = rate_limits.clone();
    let register_limits = rate_limits;

    let auth_routes = Router::new()
        .route(
            "/register",
            post(register).route_layer(middleware::from_fn(move |req, next| {
                register_rate_limit(register_limits.clone(), req, next)
            })),
        )
        .route(
            "/login",
            post(login).route_layer(middleware::from_fn(move |req, next| {
                login_rate_limit(login_limits.clone(), req, next)
            })),
        )
        .route("/profile", get(profile));

    let folder_routes = Router::new()
        .route("/", post(create_folder).get(list_folders))
        .route("/tree", get(folder_tree))
        .route("/:id", put(rename_folder).delete(delete_folder))
        .route("/:id/move", put(move_folder));

    // Upload bodies may be far larger than the JSON limit
    let upload_limit = app_state.upload.max_request_size();
    let file_routes = Router::new()
        .route(
            "/upload",
            post(upload_files).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/", get(list_files))
        .route("/:id", delete(delete_file))
        .route("/:id/download", get(download_file))
        .route("/:id/preview", get(preview_file))
        .route("/:id/rename", put(rename_file))
        .route("/:id/move", put(move_file));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/folders", folder_routes)
        .nest("/files", file_routes)
        .route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(config.json_body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&config.cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    jwt_auth(jwt_state.clone(), req, next)
                })),
        )
        .with_state(app_state)
}

/// Create the Swagger UI router serving the OpenAPI document.
pub fn create_swagger_router() -> Router {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}

/// Create a router serving the built browser client.
///
/// Unknown paths fall back to `index.html` so client-side routes resolve.
/// Returns `None` if the directory does not exist.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    let dir = Path::new(static_path);
    if !dir.is_dir() {
        tracing::warn!(path = %static_path, "Static client directory not found");
        return None;
    }

    let index = ServeFile::new(dir.join("index.html"));
    Some(Router::new().fallback_service(ServeDir::new(dir).fallback(index)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_static_router_missing_dir() {
        assert!(create_static_router("/nonexistent/drivebox/client").is_none());
    }

    #[test]
    fn test_create_static_router_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        assert!(create_static_router(dir.path().to_str().unwrap()).is_some());
    }

    #[test]
    fn test_create_swagger_router() {
        let _router = create_swagger_router();
    }
}
