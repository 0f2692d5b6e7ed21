//! Authentication handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::{authenticate, register as register_user, RegistrationRequest};
use crate::db::UserRepository;
use crate::web::dto::{
    ApiResponse, AuthResponse, LoginRequest, RegisterRequest, UserResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::CurrentUser;

/// POST /api/auth/register - Create an account.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Malformed request"),
        (status = 409, description = "Username or email already exists"),
        (status = 422, description = "Invalid username, email or password"),
        (status = 429, description = "Too many registration attempts")
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let request = RegistrationRequest::new(req.username, req.email, req.password);
    let user = register_user(&repo, &request, state.registration).await?;

    let token = state.generate_access_token(&user)?;
    let response = AuthResponse {
        token,
        expires_in: state.token_expiry,
        user: UserResponse::from(&user),
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// POST /api/auth/login - Log in with username or email.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Malformed request"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many authentication attempts")
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let user = authenticate(&repo, &req.username, &req.password).await?;

    let token = state.generate_access_token(&user)?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(ApiResponse::new(AuthResponse {
        token,
        expires_in: state.token_expiry,
        user: UserResponse::from(&user),
    })))
}

/// GET /api/auth/profile - Current user with storage usage.
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Access token required"),
        (status = 403, description = "Invalid or expired token"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn profile(CurrentUser(user): CurrentUser) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse::new(UserResponse::from(&user)))
}
