//! JWT authentication middleware.

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::{User, UserRepository};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: i64,
    /// Username.
    pub username: String,
    /// Issued at timestamp.
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
    /// JWT ID (unique identifier).
    pub jti: String,
}

/// Application state for JWT authentication.
#[derive(Clone)]
pub struct JwtState {
    /// Decoding key for JWT verification.
    pub decoding_key: DecodingKey,
    /// Validation settings.
    pub validation: Validation,
}

impl JwtState {
    /// Create a new JWT state from a secret key.
    pub fn new(secret: &str) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            decoding_key,
            validation,
        }
    }

    /// Decode and validate a token.
    pub fn verify(&self, token: &str) -> Result<JwtClaims, ApiError> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation failed: {}", e);
                ApiError::forbidden("Invalid or expired token")
            })
    }
}

/// Bearer token from the Authorization header, or the `token` query
/// parameter for links opened directly by the browser.
fn extract_token(parts: &Parts) -> Option<String> {
    let header_token = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    header_token.or_else(|| {
        parts.uri.query().and_then(|query| {
            query.split('&').find_map(|pair| {
                let (key, value) = pair.split_once('=')?;
                if key != "token" || value.is_empty() {
                    return None;
                }
                urlencoding::decode(value).ok().map(|s| s.into_owned())
            })
        })
    })
}

/// Extractor for authenticated users.
///
/// A missing token is rejected with 401, an invalid or expired token with 403.
#[derive(Debug, Clone)]
pub struct AuthUser(pub JwtClaims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token =
            extract_token(parts).ok_or_else(|| ApiError::unauthorized("Access token required"))?;

        // Get JWT state from extensions (set by middleware)
        let jwt_state = parts
            .extensions
            .get::<Arc<JwtState>>()
            .ok_or_else(|| ApiError::internal("JWT state not configured"))?;

        jwt_state.verify(&token).map(AuthUser)
    }
}

/// Extractor that resolves the token's subject to a live account.
///
/// A valid token for an account that no longer exists is rejected with 404.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;

        let user = UserRepository::new(state.db.pool())
            .get_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        Ok(CurrentUser(user))
    }
}

/// Middleware function to inject JWT state into request extensions.
pub async fn jwt_auth(
    jwt_state: Arc<JwtState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(jwt_state);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn claims(exp_offset: i64) -> JwtClaims {
        let now = chrono::Utc::now().timestamp();
        JwtClaims {
            sub: 1,
            username: "testuser".to_string(),
            iat: now as u64,
            exp: (now + exp_offset) as u64,
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    fn create_test_token(secret: &str, claims: &JwtClaims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn parts_for(uri: &str, auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_verify_valid_token() {
        let state = JwtState::new("test-secret");
        let token = create_test_token("test-secret", &claims(3600));

        let decoded = state.verify(&token).unwrap();
        assert_eq!(decoded.sub, 1);
        assert_eq!(decoded.username, "testuser");
    }

    #[test]
    fn test_expired_token_is_forbidden() {
        let state = JwtState::new("test-secret");
        let token = create_test_token("test-secret", &claims(-3600));

        let err = state.verify(&token).unwrap_err();
        assert_eq!(err.code().status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_invalid_secret_is_forbidden() {
        let token = create_test_token("secret1", &claims(3600));
        let state = JwtState::new("secret2");

        assert!(state.verify(&token).is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        let parts = parts_for("/api/files", Some("Bearer abc.def.ghi"));
        assert_eq!(extract_token(&parts).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_token_from_query() {
        let parts = parts_for("/api/files/1/download?x=1&token=abc%2Edef", None);
        assert_eq!(extract_token(&parts).as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_extract_token_missing() {
        assert!(extract_token(&parts_for("/api/files", None)).is_none());
        assert!(extract_token(&parts_for("/api/files", Some("Basic xyz"))).is_none());
        assert!(extract_token(&parts_for("/api/files?token=", None)).is_none());
    }

    #[tokio::test]
    async fn test_auth_user_missing_token_is_unauthorized() {
        let mut parts = parts_for("/api/files", None);
        let err = AuthUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.code().status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), "Access token required");
    }

    #[tokio::test]
    async fn test_auth_user_with_state() {
        let token = create_test_token("test-secret", &claims(3600));
        let mut parts = parts_for("/api/files", Some(&format!("Bearer {token}")));
        parts
            .extensions
            .insert(Arc::new(JwtState::new("test-secret")));

        let AuthUser(decoded) = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(decoded.sub, 1);
    }
}
