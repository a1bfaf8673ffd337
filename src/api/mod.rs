pub mod handlers;
pub mod models;
pub mod routes;

use std::io::ErrorKind;

use axum::Json;
use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub use routes::create_router;

use crate::error::MeterError;
use crate::service::SharedState;
use crate::storage::CsvRecorder;
use models::ErrorResponse;

/// Router state; handlers extract the part they need
#[derive(Clone)]
pub struct AppState {
    pub meter: SharedState,
    pub recorder: CsvRecorder,
}

impl FromRef<AppState> for SharedState {
    fn from_ref(app: &AppState) -> Self {
        app.meter.clone()
    }
}

impl FromRef<AppState> for CsvRecorder {
    fn from_ref(app: &AppState) -> Self {
        app.recorder.clone()
    }
}

/// Error answered as `{"error": ...}` with a matching status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<MeterError> for ApiError {
    fn from(err: MeterError) -> Self {
        let status = match &err {
            MeterError::Storage(_) => StatusCode::BAD_REQUEST,
            MeterError::Io(e) if e.kind() == ErrorKind::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
