use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::error::MeterError;
use crate::measure::CurrentChannel;
use crate::service::MeasurementRecord;

/// HTTP client for pushing measurements to the monitoring system
pub struct MonitoringClient {
    client: Client,
}

#[derive(Debug, Serialize)]
struct MeasurementPayload {
    current_rms: f64,
    voltage_rms: f64,
    real_power: f64,
    apparent_power: f64,
    power_factor: f64,
    window_time: f64,
    channel: CurrentChannel,
    timestamp: String,
}

impl From<&MeasurementRecord> for MeasurementPayload {
    fn from(record: &MeasurementRecord) -> Self {
        let m = &record.measurement;
        Self {
            current_rms: m.current_rms(),
            voltage_rms: m.voltage_rms(),
            real_power: m.real_power(),
            apparent_power: m.apparent_power(),
            power_factor: m.power_factor(),
            window_time: m.elapsed_secs(),
            channel: record.meter.channel,
            timestamp: record.timestamp.to_rfc3339(),
        }
    }
}

/// Endpoint receiving the measurements of `meter_id`
pub fn measurements_url(api_url: &str, meter_id: &str) -> String {
    format!("{}/meters/{}/measurements", api_url.trim_end_matches('/'), meter_id)
}

impl MonitoringClient {
    pub fn new() -> Result<Self, MeterError> {
        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;

        Ok(Self { client })
    }

    /// Post one measurement to the monitoring API
    pub async fn post_measurement(
        &self,
        api_url: &str,
        meter_id: &str,
        record: &MeasurementRecord,
    ) -> Result<(), MeterError> {
        let url = measurements_url(api_url, meter_id);
        let payload = MeasurementPayload::from(record);

        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Failed to post measurement: {} - {}", status, body);
            return Err(MeterError::Monitoring(format!(
                "Monitoring API returned {}",
                status
            )));
        }

        tracing::debug!("Posted measurement to {}", url);
        Ok(())
    }
}
