use axum::extract::{rejection::JsonRejection, Extension, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRequest {
    #[serde(alias = "file_name")]
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct ArchiveResult {
    pub archived: String,
}

/// POST /api/files/archive - Move a document into `archive/`
pub async fn archive_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<ArchiveRequest>, JsonRejection>,
) -> ApiResult<ArchiveResult> {
    let Json(request) = payload?;
    let archived = state.fs().archive_document(user.tenant, &request.file_name).await?;
    Ok(ApiResponse::success(ArchiveResult { archived }))
}
