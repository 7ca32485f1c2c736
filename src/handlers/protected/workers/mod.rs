// handlers/protected/workers/mod.rs - Active and archived subordinate workers

use axum::extract::{Extension, State};

use crate::database::executor::JsonRow;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /api/workers/active
pub async fn workers_active_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<JsonRow>> {
    Ok(ApiResponse::success(state.workers().list_active(user.tenant).await?))
}

/// GET /api/workers/archived
pub async fn workers_archived_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<JsonRow>> {
    Ok(ApiResponse::success(state.workers().list_archived(user.tenant).await?))
}
