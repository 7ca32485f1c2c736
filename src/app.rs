use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{elevated, protected, public};
use crate::middleware::{jwt_auth_middleware, require_admin_middleware, validate_account_middleware};
use crate::state::AppState;

/// The complete HTTP surface
pub fn app(state: AppState) -> Router {
    let body_limit = state.config().api.max_request_size_bytes;
    let request_logging = state.config().api.enable_request_logging;
    let cors = cors_layer(&state);

    let router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(auth_public_routes())
        // Protected API
        .merge(protected_routes(state.clone()))
        // Administrators only
        .merge(admin_routes(state.clone()))
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors);

    let router = if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };
    router.with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(public::register_post))
        .route("/auth/login", post(public::login_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::data;

    Router::new()
        .route("/api/auth/whoami", get(protected::whoami_get))
        // Entity collection and record operations
        .route("/api/data/:entity", get(data::schema_get).post(data::schema_post))
        .route(
            "/api/data/:entity/:id",
            get(data::record_get)
                .put(data::record_put)
                .patch(data::record_put)
                .delete(data::record_delete),
        )
        // Column metadata
        .route("/api/describe/:entity/columns", get(protected::columns_get))
        .route("/api/describe/:entity/fields", get(protected::fields_get))
        // Worker views
        .route("/api/workers/active", get(protected::workers_active_get))
        .route("/api/workers/archived", get(protected::workers_archived_get))
        // Filesystem namespace
        .route("/api/files/tree", get(protected::tree_get))
        .route("/api/files/preview", get(protected::preview_get))
        .route("/api/files/download", get(protected::download_get))
        .route("/api/files/export", get(protected::export_get))
        .route("/api/files/archive", post(protected::archive_post))
        .route(
            "/api/files/settings",
            get(protected::settings_get).patch(protected::settings_patch),
        )
        // Layers run bottom-up: authenticate, then confirm the account still exists
        .route_layer(from_fn_with_state(state.clone(), validate_account_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/admin/accounts", get(elevated::accounts_list))
        .route("/api/admin/accounts/:id", axum::routing::delete(elevated::account_delete))
        .route("/api/admin/accounts/:id/suspend", post(elevated::account_suspend))
        .route("/api/admin/accounts/:id/unsuspend", post(elevated::account_unsuspend))
        // Layers run bottom-up: authenticate, confirm the account, then check the role
        .route_layer(from_fn(require_admin_middleware))
        .route_layer(from_fn_with_state(state.clone(), validate_account_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let security = &state.config().security;
    if !security.enable_cors {
        return CorsLayer::new();
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
