//! Health check handler.

use axum::Json;

use crate::datetime::now_rfc3339;
use crate::web::dto::{ApiResponse, HealthResponse};

/// GET /api/health - Liveness probe.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::new(HealthResponse {
        status: "OK".to_string(),
        timestamp: now_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let Json(response) = health_check().await;
        assert_eq!(response.data.status, "OK");
        assert_eq!(response.data.version, env!("CARGO_PKG_VERSION"));
        assert!(response.data.timestamp.ends_with('Z'));
    }
}
