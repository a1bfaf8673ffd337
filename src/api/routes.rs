use axum::Router;
use axum::routing::{get, post};

use super::AppState;
use super::handlers::{device, files, measurement, session};
use crate::service::SharedState;
use crate::storage::CsvRecorder;

/// Create the API router with all endpoints
pub fn create_router(state: SharedState, recorder: CsvRecorder) -> Router {
    Router::new()
        // Device info and registration
        .route("/device/info", get(device::get_device_info))
        .route("/register", post(device::register))
        // Live values
        .route("/measurement", get(measurement::get_measurement))
        .route("/meter/status", get(measurement::get_meter_status))
        // Recording sessions
        .route("/session/start", post(session::start_session))
        .route("/session/stop", post(session::stop_session))
        .route("/session/status", get(session::get_session_status))
        // Stored data
        .route("/files", get(files::list_files))
        .route("/files/{session}/{file}", get(files::transfer_file))
        .with_state(AppState {
            meter: state,
            recorder,
        })
}
