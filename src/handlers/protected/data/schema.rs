use axum::extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    Extension, Path, Query, State,
};
use axum::Json;
use serde_json::Value;

use crate::database::entity::Entity;
use crate::database::executor::JsonRow;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

use super::utils::{object_body, parse_entity, ListQuery};

/// GET /api/data/:entity - Newest records first, `?limit=&offset=`
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<JsonRow>> {
    let Path(segment) = path?;
    let Query(query) = query?;
    let entity = parse_entity(&segment)?;

    let rows = match entity {
        Entity::SubordinateWorker => state.workers().list(user.tenant, query.limit, query.offset).await?,
        _ => {
            state
                .crud()
                .list(user.tenant, entity, query.limit, query.offset)
                .await?
        }
    };
    Ok(ApiResponse::success(rows))
}

/// POST /api/data/:entity - Create one record from the writable live columns in the body
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<JsonRow> {
    let Path(segment) = path?;
    let entity = parse_entity(&segment)?;
    let payload = object_body(payload)?;

    let row = match entity {
        Entity::SubordinateWorker => state.workers().create(user.tenant, &payload).await?,
        _ => state.crud().create(user.tenant, entity, &payload).await?,
    };
    Ok(ApiResponse::created(row))
}
