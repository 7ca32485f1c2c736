use axum::extract::{rejection::QueryRejection, Extension, Query, State};
use serde::Deserialize;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::storage::{FilePreview, TreeEntry};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: String,
}

/// GET /api/files/tree
pub async fn tree_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<TreeEntry>> {
    let tree = state.fs().list_tree(user.tenant).await?;
    Ok(ApiResponse::success(tree))
}

/// GET /api/files/preview?path=
pub async fn preview_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> ApiResult<FilePreview> {
    let Query(query) = query?;
    let preview = state.fs().preview_file(user.tenant, &query.path).await?;
    Ok(ApiResponse::success(preview))
}
