// handlers/protected/auth/whoami.rs - GET /api/auth/whoami handler

use axum::extract::Extension;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/auth/whoami - Identity carried by the presented token
pub async fn whoami_get(Extension(user): Extension<AuthUser>) -> ApiResult<AuthUser> {
    Ok(ApiResponse::success(user))
}
