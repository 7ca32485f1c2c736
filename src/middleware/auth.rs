use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::error::ApiError;
use crate::services::credentials::Claims;
use crate::state::AppState;
use crate::types::{Role, TenantId};

/// Authenticated tenant context extracted from JWT
#[derive(Clone, Debug, Serialize)]
pub struct AuthUser {
    pub tenant: TenantId,
    pub email: String,
    pub role: Role,
    pub exp: i64,
}

impl TryFrom<Claims> for AuthUser {
    type Error = ApiError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            tenant: claims.tenant()?,
            role: claims.role(),
            email: claims.email,
            exp: claims.exp,
        })
    }
}

/// JWT authentication middleware that validates tokens and extracts tenant context
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;
    let claims = state.credentials().verify_token(&token)?;

    let auth_user = AuthUser::try_from(claims)?;
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Second layer on administrative routes; runs after `jwt_auth_middleware`
pub async fn require_admin_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required"))?;
    if user.role != Role::Admin {
        tracing::warn!(tenant = %user.tenant, "Non-admin request to administrative route");
        return Err(ApiError::forbidden("administrator access required"));
    }
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
