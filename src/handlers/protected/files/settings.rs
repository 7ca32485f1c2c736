use axum::extract::{rejection::JsonRejection, Extension, State};
use axum::Json;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::storage::{SettingsPatch, TenantSettings};
use crate::state::AppState;

/// GET /api/files/settings - The namespace's root `data.json`
pub async fn settings_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<TenantSettings> {
    Ok(ApiResponse::success(state.fs().read_settings(user.tenant).await?))
}

/// PATCH /api/files/settings - Merge `storeInfo` / `settings` fields
pub async fn settings_patch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<SettingsPatch>, JsonRejection>,
) -> ApiResult<TenantSettings> {
    let Json(patch) = payload?;
    Ok(ApiResponse::success(state.fs().update_settings(user.tenant, patch).await?))
}
