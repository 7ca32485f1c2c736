// handlers/protected/describe/mod.rs - Live column metadata for form builders

use axum::extract::{rejection::PathRejection, Extension, Path, State};
use serde::Serialize;

use crate::database::introspect::FieldType;
use crate::database::registry::ColumnInfo;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

use super::data::utils::parse_entity;

#[derive(Debug, Serialize)]
pub struct FieldView {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// GET /api/describe/:entity/columns - Catalog columns in physical order
pub async fn columns_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Vec<ColumnInfo>> {
    let Path(segment) = path?;
    let entity = parse_entity(&segment)?;
    let columns = state.introspector().get_columns(user.tenant, entity).await?;
    Ok(ApiResponse::success(columns))
}

/// GET /api/describe/:entity/fields - Column names with an inferred input type
pub async fn fields_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Vec<FieldView>> {
    let Path(segment) = path?;
    let entity = parse_entity(&segment)?;
    let fields = state
        .introspector()
        .get_field_types(user.tenant, entity)
        .await?
        .into_iter()
        .map(|(name, field_type)| FieldView { name, field_type })
        .collect();
    Ok(ApiResponse::success(fields))
}
