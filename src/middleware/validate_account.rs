use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Rejects tokens whose account has been deleted since they were issued.
/// Must run after `jwt_auth_middleware`.
pub async fn validate_account_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let tenant = request
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.tenant)
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before account validation"))?;

    state.accounts().verify_active(tenant).await?;
    Ok(next.run(request).await)
}
