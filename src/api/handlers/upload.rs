use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::api::response::ApiError;
use crate::backend::Provider;
use crate::AppState;

/// POST /upload/file — stream every file part to the gdrive backend in
/// order. The first upload error aborts the remaining parts.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<StatusCode, ApiError> {
    let backend = state
        .registry
        .get(Provider::Gdrive.name())
        .await
        .ok_or_else(|| ApiError::internal("gdrive backend is not registered"))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::internal(format!("error while receiving file upload: {e}")))?
    {
        let Some(file_name) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::internal(format!("error while reading {file_name}: {e}")))?;

        tracing::info!(file = %file_name, bytes = data.len(), "Received upload");
        backend.upload_file(&file_name, data).await?;
    }

    Ok(StatusCode::OK)
}

/// Any other /upload/ subpath is silently ignored; non-POST verbs are still
/// rejected.
pub async fn upload_ignored(method: axum::http::Method, uri: axum::http::Uri) -> Response {
    if method == axum::http::Method::POST {
        tracing::info!(path = %uri.path(), "Ignoring unknown upload path");
        StatusCode::OK.into_response()
    } else {
        ApiError::bad_request("Bad Request").into_response()
    }
}
