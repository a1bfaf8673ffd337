use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::MeasurementRecord;
use crate::adc::AdcReader;
use crate::clock::Clock;
use crate::error::MeterError;
use crate::measure::PowerMeter;

/// What the measurement task reports to the processing loop
#[derive(Debug, Clone)]
pub enum MeterEvent {
    Record(MeasurementRecord),
    /// The task stopped on an error; no further events follow
    Failed(String),
}

/// Runs measurement cycles on a blocking thread and sends each result out by
/// value
pub struct MeasurementTask {
    interval: Duration,
    clock: Arc<dyn Clock>,
    is_active: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<(), MeterError>>>,
}

impl MeasurementTask {
    pub fn new(interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            interval,
            clock,
            is_active: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Prime `meter` and start cycling. Events arrive on the returned receiver.
    pub fn start<A>(&mut self, meter: PowerMeter<A>) -> mpsc::Receiver<MeterEvent>
    where
        A: AdcReader + 'static,
    {
        let (event_tx, event_rx) = mpsc::channel(32);

        self.is_active.store(true, Ordering::SeqCst);
        let is_active = self.is_active.clone();
        let clock = self.clock.clone();
        let interval = self.interval;

        let worker = tokio::task::spawn_blocking(move || {
            let mut meter = meter;

            tracing::info!("Measurement task started");

            let outcome = run_cycles(&mut meter, &is_active, interval, clock.as_ref(), &event_tx);
            if let Err(e) = &outcome {
                tracing::error!("Measurement task failed: {}", e);
                let _ = event_tx.blocking_send(MeterEvent::Failed(e.to_string()));
            }

            is_active.store(false, Ordering::SeqCst);
            tracing::info!("Measurement task stopped");

            outcome
        });

        self.worker = Some(worker);

        event_rx
    }

    /// Stop after the running cycle and return how the task ended
    pub async fn stop(&mut self) -> Result<(), MeterError> {
        self.is_active.store(false, Ordering::SeqCst);

        match self.worker.take() {
            Some(handle) => handle
                .await
                .map_err(|e| MeterError::Task(e.to_string()))?,
            None => Ok(()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}

fn run_cycles<A: AdcReader>(
    meter: &mut PowerMeter<A>,
    is_active: &AtomicBool,
    interval: Duration,
    clock: &dyn Clock,
    event_tx: &mpsc::Sender<MeterEvent>,
) -> Result<(), MeterError> {
    meter.begin()?;

    while is_active.load(Ordering::SeqCst) {
        let was_amplified = meter.is_amplified();
        let measurement = meter.acquire_and_calculate()?;
        if meter.is_amplified() != was_amplified {
            tracing::info!(
                "Current {:.3} A, next cycle reads the {:?} input",
                measurement.current_rms(),
                meter.snapshot().channel
            );
        }
        let record = MeasurementRecord {
            timestamp: clock.now(),
            measurement,
            meter: meter.snapshot(),
        };

        if event_tx.blocking_send(MeterEvent::Record(record)).is_err() {
            tracing::warn!("Event receiver dropped, stopping measurements");
            break;
        }

        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }

    Ok(())
}
