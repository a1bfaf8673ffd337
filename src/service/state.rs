use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::measure::{Measurement, MeterSnapshot};

/// One measurement cycle as it leaves the measurement task
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasurementRecord {
    pub timestamp: DateTime<Local>,
    pub measurement: Measurement,
    pub meter: MeterSnapshot,
}

/// Application state for the power meter service
#[derive(Debug, Clone, Default)]
pub struct MeterState {
    // Registration from the monitoring system
    pub monitoring_api_url: Option<String>,
    pub meter_id: Option<String>,

    // Recording session, `Some` while recording
    pub active_session: Option<String>,

    // Measurement task
    pub is_measuring: bool,
    pub cycles: u64,
    pub last_error: Option<String>,
    pub alert_on: bool,

    pub latest: Option<MeasurementRecord>,
}

impl MeterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the meter is registered with monitoring API
    pub fn is_registered(&self) -> bool {
        self.monitoring_api_url.is_some() && self.meter_id.is_some()
    }

    pub fn is_recording(&self) -> bool {
        self.active_session.is_some()
    }
}

/// Thread-safe shared state
pub type SharedState = Arc<RwLock<MeterState>>;

/// Create a new shared state instance
pub fn create_shared_state() -> SharedState {
    Arc::new(RwLock::new(MeterState::new()))
}
