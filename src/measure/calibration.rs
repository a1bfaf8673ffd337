use crate::adc::{ADC_FULL_SCALE, AdcInput, AdcReader, RawAdcValue};
use crate::error::AdcError;

/// Band-gap reference voltage of the converter, measured on the target board
pub const INTERNAL_REFERENCE_VOLTS: f64 = 1.1034;

/// Supply-rail calibrator keeping the highest estimate ever observed.
///
/// Conversion noise on the reference comparison can only under-report the
/// rail, so the estimate is a ratchet: it never decreases and is never reset.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCalibrator {
    /// Volts at ADC full scale; `0.0` until the first valid reading
    reference_voltage: f64,
}

impl ReferenceCalibrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply estimate for one raw reading of the internal reference
    ///
    /// Returns `None` for a zero reading.
    pub fn estimate(raw: RawAdcValue) -> Option<f64> {
        if raw == 0 {
            return None;
        }
        Some(INTERNAL_REFERENCE_VOLTS * ADC_FULL_SCALE / raw as f64)
    }

    /// Feed one raw reference reading, returning whether the ratchet moved
    pub fn update(&mut self, raw: RawAdcValue) -> bool {
        let Some(estimate) = Self::estimate(raw) else {
            tracing::warn!("Zero reference reading, keeping {:.4} V", self.reference_voltage);
            return false;
        };

        if estimate > self.reference_voltage {
            tracing::debug!(
                "Reference voltage raised {:.4} V -> {:.4} V (raw {})",
                self.reference_voltage,
                estimate,
                raw
            );
            self.reference_voltage = estimate;
            return true;
        }

        false
    }

    /// Perform one reference conversion and update the ratchet
    pub fn calibrate<A: AdcReader + ?Sized>(&mut self, adc: &mut A) -> Result<f64, AdcError> {
        let raw = adc.read(AdcInput::InternalReference)?;
        self.update(raw);
        Ok(self.reference_voltage)
    }

    pub fn reference_voltage(&self) -> f64 {
        self.reference_voltage
    }

    pub fn is_calibrated(&self) -> bool {
        self.reference_voltage > 0.0
    }
}
