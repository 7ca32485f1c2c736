// handlers/public/auth/register.rs - POST /auth/register handler

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::accounts::{Account, RegisterRequest};
use crate::state::AppState;

/// POST /auth/register - Create an account with its tables and storage namespace
pub async fn register_post(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Account> {
    let Json(request) = payload?;
    let account = state.accounts().register(request).await?;
    Ok(ApiResponse::created(account))
}
