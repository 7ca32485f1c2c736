use axum::extract::{
    rejection::{JsonRejection, PathRejection},
    Extension, Path, State,
};
use axum::Json;
use serde_json::Value;

use crate::database::entity::Entity;
use crate::database::executor::JsonRow;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

use super::utils::{object_body, parse_entity};

/// GET /api/data/:entity/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> ApiResult<JsonRow> {
    let Path((segment, id)) = path?;
    let entity = parse_entity(&segment)?;

    let row = match entity {
        Entity::SubordinateWorker => state.workers().get(user.tenant, id).await?,
        _ => state.crud().get_404(user.tenant, entity, id).await?,
    };
    Ok(ApiResponse::success(row))
}

/// PUT|PATCH /api/data/:entity/:id - Partial update; explicit nulls clear a column
pub async fn put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<(String, i64)>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<JsonRow> {
    let Path((segment, id)) = path?;
    let entity = parse_entity(&segment)?;
    let payload = object_body(payload)?;

    let row = match entity {
        Entity::SubordinateWorker => state.workers().update(user.tenant, id, &payload).await?,
        _ => state.crud().update(user.tenant, entity, id, &payload).await?,
    };
    Ok(ApiResponse::success(row))
}

/// DELETE /api/data/:entity/:id - Hard delete, except workers which are deactivated
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> ApiResult<JsonRow> {
    let Path((segment, id)) = path?;
    let entity = parse_entity(&segment)?;

    let row = match entity {
        Entity::SubordinateWorker => state.workers().deactivate(user.tenant, id).await?,
        _ => state.crud().delete(user.tenant, entity, id).await?,
    };
    Ok(ApiResponse::success(row))
}
