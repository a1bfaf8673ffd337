use axum::Json;
use axum::extract::State;

use crate::api::models::*;
use crate::service::SharedState;

/// GET /device/info - Return device capabilities
pub async fn get_device_info() -> Json<DeviceInfoResponse> {
    let quantities = [
        "current_rms",
        "voltage_rms",
        "real_power",
        "apparent_power",
        "power_factor",
    ];

    Json(DeviceInfoResponse {
        device_type: "power_meter".to_string(),
        name: "Single-phase AC Power Meter".to_string(),
        capabilities: DeviceCapabilities {
            quantities: quantities.iter().map(|q| q.to_string()).collect(),
            auto_range: true,
            has_storage: true,
        },
    })
}

/// POST /register - Receive assigned ID from monitoring system
pub async fn register(
    State(state): State<SharedState>,
    Json(request): Json<RegisterRequest>,
) -> Json<RegisterResponse> {
    let mut state = state.write().await;

    state.monitoring_api_url = Some(request.monitoring_api_url.clone());
    state.meter_id = request.meter_id.clone();

    tracing::info!(
        "Registered with monitoring API: {}, meter_id: {:?}",
        request.monitoring_api_url,
        request.meter_id
    );
    if !state.is_registered() {
        tracing::warn!("No meter ID assigned, measurements will not be pushed");
    }

    Json(RegisterResponse {
        status: "registered".to_string(),
        meter_id: state.meter_id.clone(),
        monitoring_api_url: request.monitoring_api_url,
    })
}
