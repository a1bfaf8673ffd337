use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::measure::{CurrentChannel, MeterSnapshot};
use crate::service::MeasurementRecord;
use crate::storage::SessionFiles;

// ============= Device Endpoints =============

#[derive(Debug, Serialize)]
pub struct DeviceInfoResponse {
    #[serde(rename = "type")]
    pub device_type: String,
    pub name: String,
    pub capabilities: DeviceCapabilities,
}

#[derive(Debug, Serialize)]
pub struct DeviceCapabilities {
    pub quantities: Vec<String>,
    pub auto_range: bool,
    pub has_storage: bool,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub monitoring_api_url: String,
    pub meter_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub status: String,
    pub meter_id: Option<String>,
    pub monitoring_api_url: String,
}

// ============= Measurement Endpoints =============

#[derive(Debug, Serialize)]
pub struct MeasurementResponse {
    pub timestamp: DateTime<Local>,
    pub current_rms: f64,
    pub voltage_rms: f64,
    pub real_power: f64,
    pub apparent_power: f64,
    pub power_factor: f64,
    pub window_time: f64,
    pub channel: CurrentChannel,
}

impl From<&MeasurementRecord> for MeasurementResponse {
    fn from(record: &MeasurementRecord) -> Self {
        let m = &record.measurement;
        Self {
            timestamp: record.timestamp,
            current_rms: m.current_rms(),
            voltage_rms: m.voltage_rms(),
            real_power: m.real_power(),
            apparent_power: m.apparent_power(),
            power_factor: m.power_factor(),
            window_time: m.elapsed_secs(),
            channel: record.meter.channel,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeterStatusResponse {
    pub is_measuring: bool,
    pub cycles: u64,
    /// Calibration and range state after the latest cycle
    pub meter: Option<MeterSnapshot>,
    pub alert_on: bool,
    pub last_error: Option<String>,
}

// ============= Session Endpoints =============

#[derive(Debug, Deserialize)]
pub struct SessionStartRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub status: String,
    pub session: Option<String>,
}

impl SessionStatusResponse {
    pub fn new(session: Option<String>) -> Self {
        let status = if session.is_some() { "recording" } else { "idle" };
        Self {
            status: status.to_string(),
            session,
        }
    }
}

// ============= File Endpoints =============

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    pub sessions: Vec<SessionFiles>,
}

// ============= Error Response =============

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
