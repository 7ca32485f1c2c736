// Streamed responses: single-file download and whole-namespace export

use axum::body::Body;
use axum::extract::{rejection::QueryRejection, Extension, Query, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

use super::tree::PathQuery;

/// GET /api/files/download?path=
pub async fn download_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let (meta, stream) = state.fs().open_download(user.tenant, &query.path).await?;

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
        (header::CONTENT_LENGTH, HeaderValue::from(meta.size)),
        (header::CONTENT_DISPOSITION, attachment(&meta.name)?),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}

/// GET /api/files/export - tar.gz of the namespace plus one JSON dump per table
pub async fn export_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, ApiError> {
    let stream = state.namespace().export(user.tenant).await?;
    let file_name = format!(
        "tenant_{}_export_{}.tar.gz",
        user.tenant,
        chrono::Utc::now().format("%Y%m%d%H%M%S")
    );

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("application/gzip")),
        (header::CONTENT_DISPOSITION, attachment(&file_name)?),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}

fn attachment(file_name: &str) -> Result<HeaderValue, ApiError> {
    let safe: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", safe))
        .map_err(|_| ApiError::internal_server_error("Failed to build download headers"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_names_are_quoted_and_sanitized() {
        let value = attachment("in\"voice 1.pdf").unwrap();
        assert_eq!(value.to_str().unwrap(), "attachment; filename=\"in_voice_1.pdf\"");
        assert!(attachment("факт.pdf").unwrap().to_str().unwrap().ends_with("_.pdf\""));
    }
}
