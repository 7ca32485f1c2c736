// handlers/elevated/accounts/mod.rs - Account administration

use axum::extract::{rejection::PathRejection, Extension, Path, State};
use tracing::info;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::accounts::{Account, DeletionReport};
use crate::state::AppState;

/// GET /api/admin/accounts
pub async fn accounts_list(State(state): State<AppState>) -> ApiResult<Vec<Account>> {
    Ok(ApiResponse::success(state.accounts().list_accounts().await?))
}

/// POST /api/admin/accounts/:id/suspend
pub async fn account_suspend(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Account> {
    let Path(id) = path?;
    info!(admin = %admin.email, account = id, "Suspend requested");
    Ok(ApiResponse::success(state.accounts().suspend(id).await?))
}

/// POST /api/admin/accounts/:id/unsuspend
pub async fn account_unsuspend(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Account> {
    let Path(id) = path?;
    info!(admin = %admin.email, account = id, "Unsuspend requested");
    Ok(ApiResponse::success(state.accounts().unsuspend(id).await?))
}

/// DELETE /api/admin/accounts/:id - Drop tables, namespace and account row
pub async fn account_delete(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<DeletionReport> {
    let Path(id) = path?;
    info!(admin = %admin.email, account = id, "Account deletion requested");
    Ok(ApiResponse::success(state.accounts().delete_account(id).await?))
}
