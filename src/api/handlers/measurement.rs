use axum::Json;
use axum::extract::State;

use crate::api::ApiError;
use crate::api::models::*;
use crate::service::SharedState;

/// GET /measurement - Latest measurement
pub async fn get_measurement(
    State(state): State<SharedState>,
) -> Result<Json<MeasurementResponse>, ApiError> {
    let state = state.read().await;

    state
        .latest
        .as_ref()
        .map(|record| Json(MeasurementResponse::from(record)))
        .ok_or_else(|| ApiError::not_found("No measurement available yet"))
}

/// GET /meter/status - Measurement task and calibration state
pub async fn get_meter_status(State(state): State<SharedState>) -> Json<MeterStatusResponse> {
    let state = state.read().await;

    Json(MeterStatusResponse {
        is_measuring: state.is_measuring,
        cycles: state.cycles,
        meter: state.latest.map(|record| record.meter),
        alert_on: state.alert_on,
        last_error: state.last_error.clone(),
    })
}
