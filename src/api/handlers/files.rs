use axum::Json;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;

use crate::api::ApiError;
use crate::api::models::*;
use crate::storage::CsvRecorder;

/// GET /files - Sessions and their data files
pub async fn list_files(
    State(recorder): State<CsvRecorder>,
) -> Result<Json<FilesResponse>, ApiError> {
    let sessions = recorder.list_files().await?;

    Ok(Json(FilesResponse { sessions }))
}

/// GET /files/{session}/{file} - Data file as CSV, header first
pub async fn transfer_file(
    State(recorder): State<CsvRecorder>,
    Path((session, file)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let contents = recorder.transfer_file(&session, &file).await?;

    tracing::debug!("Transferring {}/{}", session, file);

    Ok(([(header::CONTENT_TYPE, "text/csv")], contents))
}
