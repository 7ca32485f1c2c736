// handlers/public/auth/login.rs - POST /auth/login handler

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::accounts::{LoginRequest, LoginResponse};
use crate::state::AppState;

/// POST /auth/login - Verify credentials and receive a JWT.
///
/// Also re-provisions the tenant's tables and namespace, so a login repairs
/// anything removed out of band.
///
/// ```json
/// { "email": "owner@shop.com", "password": "secret1" }
/// ```
pub async fn login_post(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(request) = payload?;
    let response = state.accounts().login(request).await?;
    Ok(ApiResponse::success(response))
}
