use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::measurement_loop::MeterEvent;
use crate::error::MeterError;
use crate::indicator::Indicator;
use crate::monitoring::MonitoringClient;
use crate::service::{MeasurementRecord, SharedState};
use crate::storage::CsvRecorder;

/// Blinks signalling a record that could not be stored
const STORAGE_ALERT_BLINKS: u32 = 3;
const STORAGE_ALERT_INTERVAL: Duration = Duration::from_millis(100);

/// Background loop consuming measurement events
pub struct DataProcessingLoop {
    state: SharedState,
    recorder: CsvRecorder,
    indicator: Arc<dyn Indicator>,
    monitoring_client: MonitoringClient,
}

impl DataProcessingLoop {
    pub fn new(
        state: SharedState,
        recorder: CsvRecorder,
        indicator: Arc<dyn Indicator>,
    ) -> Result<Self, MeterError> {
        Ok(Self {
            state,
            recorder,
            indicator,
            monitoring_client: MonitoringClient::new()?,
        })
    }

    /// Run the processing loop until the measurement task hangs up
    pub async fn run(&self, mut event_rx: mpsc::Receiver<MeterEvent>) -> Result<(), MeterError> {
        tracing::info!("Data processing loop started");

        while let Some(event) = event_rx.recv().await {
            match event {
                MeterEvent::Record(record) => self.process_record(&record).await,
                MeterEvent::Failed(message) => self.process_failure(message).await,
            }
        }

        self.state.write().await.is_measuring = false;

        tracing::info!("Data processing loop finished");
        Ok(())
    }

    async fn process_record(&self, record: &MeasurementRecord) {
        // Update state with latest record
        let session = {
            let mut state = self.state.write().await;
            state.latest = Some(*record);
            state.cycles += 1;
            state.is_measuring = true;
            state.active_session.clone()
        };

        if let Some(session) = session {
            if let Err(e) = self.recorder.record(&session, record).await {
                tracing::error!("Failed to record measurement in {}: {}", session, e);
                self.indicator
                    .blink(STORAGE_ALERT_BLINKS, STORAGE_ALERT_INTERVAL)
                    .await;
            }
        }

        self.push_to_monitoring(record).await;
    }

    async fn process_failure(&self, message: String) {
        {
            let mut state = self.state.write().await;
            state.is_measuring = false;
            state.last_error = Some(message);
        }
        self.indicator.set_on().await;
    }

    /// Push a record to the monitoring API
    async fn push_to_monitoring(&self, record: &MeasurementRecord) {
        let (api_url, meter_id) = {
            let state = self.state.read().await;
            (state.monitoring_api_url.clone(), state.meter_id.clone())
        };

        let Some(api_url) = api_url else {
            tracing::trace!("Not registered - skipping push");
            return;
        };

        let Some(meter_id) = meter_id else {
            tracing::trace!("No meter ID - skipping push");
            return;
        };

        if let Err(e) = self
            .monitoring_client
            .post_measurement(&api_url, &meter_id, record)
            .await
        {
            tracing::error!("Failed to push measurement to monitoring: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::clock::Clock;
    use crate::clock::testing::FixedClock;
    use crate::indicator::StateIndicator;
    use crate::measure::types::WindowResult;
    use crate::measure::{CurrentChannel, Measurement, MeterSnapshot};
    use crate::service::state::create_shared_state;

    fn record(current: f64) -> MeasurementRecord {
        let values = WindowResult {
            current_rms: current,
            voltage_rms: 127.0,
            real_power: current * 127.0,
            apparent_power: current * 127.0,
            power_factor: 1.0,
        };
        MeasurementRecord {
            timestamp: FixedClock::at(2024, 6, 1, 12, 0, 0).now(),
            measurement: Measurement::new(values, Duration::from_millis(500)),
            meter: MeterSnapshot {
                channel: CurrentChannel::Standard,
                reference_voltage: 5.0,
                zero_current_volts: 2.5,
                zero_voltage_volts: 2.5,
            },
        }
    }

    async fn processing_loop() -> (TempDir, SharedState, DataProcessingLoop) {
        let dir = TempDir::new().unwrap();
        let state = create_shared_state();
        let recorder = CsvRecorder::open(dir.path()).await.unwrap();
        let indicator = Arc::new(StateIndicator::new(state.clone()));
        let processing = DataProcessingLoop::new(state.clone(), recorder, indicator).unwrap();
        (dir, state, processing)
    }

    #[tokio::test]
    async fn test_latest_record_is_published() {
        let (_dir, state, processing) = processing_loop().await;
        let (tx, rx) = mpsc::channel(4);

        tx.send(MeterEvent::Record(record(1.0))).await.unwrap();
        tx.send(MeterEvent::Record(record(2.0))).await.unwrap();
        drop(tx);
        processing.run(rx).await.unwrap();

        let state = state.read().await;
        assert_eq!(state.cycles, 2);
        assert_eq!(state.latest.unwrap().measurement.current_rms(), 2.0);
        assert!(!state.is_measuring);
    }

    #[tokio::test]
    async fn test_records_only_while_recording() {
        let (dir, state, processing) = processing_loop().await;
        processing.recorder.make_session_dir("lab").await.unwrap();

        processing.process_record(&record(1.0)).await;
        assert!(!dir.path().join("lab/20240601.csv").exists());

        state.write().await.active_session = Some("lab".to_string());
        processing.process_record(&record(1.0)).await;
        processing.process_record(&record(1.5)).await;

        let contents = std::fs::read_to_string(dir.path().join("lab/20240601.csv")).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_running() {
        let (_dir, state, processing) = processing_loop().await;
        // No directory behind the session
        state.write().await.active_session = Some("missing".to_string());

        processing.process_record(&record(1.0)).await;

        let state = state.read().await;
        assert_eq!(state.cycles, 1);
        // Blink restores the indicator
        assert!(!state.alert_on);
    }

    #[tokio::test]
    async fn test_failure_sets_alert() {
        let (_dir, state, processing) = processing_loop().await;
        let (tx, rx) = mpsc::channel(4);

        tx.send(MeterEvent::Record(record(1.0))).await.unwrap();
        tx.send(MeterEvent::Failed("ADC error: timeout".to_string()))
            .await
            .unwrap();
        drop(tx);
        processing.run(rx).await.unwrap();

        let state = state.read().await;
        assert!(state.alert_on);
        assert!(!state.is_measuring);
        assert_eq!(state.last_error.as_deref(), Some("ADC error: timeout"));
    }
}
