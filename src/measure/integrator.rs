use super::offset::{ZeroOffsetTracker, ZeroOffsets};
use crate::adc::{AdcInput, AdcReader, RawAdcValue};
use crate::error::AdcError;

/// Running sums of one window, in squared / multiplied ADC codes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulators {
    pub sum_sqr_current: f64,
    pub sum_sqr_voltage: f64,
    pub sum_inst_power: f64,
}

impl Accumulators {
    /// Accumulate one zero-centred sample pair
    pub fn accumulate(&mut self, current: f64, voltage: f64) {
        self.sum_sqr_current += current * current;
        self.sum_sqr_voltage += voltage * voltage;
        self.sum_inst_power += voltage * current;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[cfg(test)]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Remove the DC offsets from one raw sample pair
pub fn center(current: RawAdcValue, voltage: RawAdcValue, offsets: ZeroOffsets) -> (f64, f64) {
    (current as f64 - offsets.current, voltage as f64 - offsets.voltage)
}

/// Read one window of samples from the active current input and the voltage
/// input.
///
/// Raw values feed the tracker's sums for the next window; offset-corrected
/// values feed the accumulators. Only ADC conversions block.
pub fn integrate_window<A: AdcReader + ?Sized>(
    adc: &mut A,
    current_input: AdcInput,
    voltage_input: AdcInput,
    samples_per_window: u32,
    tracker: &mut ZeroOffsetTracker,
    acc: &mut Accumulators,
) -> Result<(), AdcError> {
    let offsets = tracker.offsets();

    for _ in 0..samples_per_window {
        let raw_current = adc.read(current_input)?;
        let raw_voltage = adc.read(voltage_input)?;

        tracker.observe(raw_current, raw_voltage);

        let (current, voltage) = center(raw_current, raw_voltage, offsets);
        acc.accumulate(current, voltage);
    }

    Ok(())
}

/// Read one window of raw samples only, to seed the tracker before the first
/// integrated window
pub fn prime_offsets<A: AdcReader + ?Sized>(
    adc: &mut A,
    current_input: AdcInput,
    voltage_input: AdcInput,
    samples_per_window: u32,
    tracker: &mut ZeroOffsetTracker,
) -> Result<ZeroOffsets, AdcError> {
    for _ in 0..samples_per_window {
        let raw_current = adc.read(current_input)?;
        let raw_voltage = adc.read(voltage_input)?;
        tracker.observe(raw_current, raw_voltage);
    }

    Ok(tracker.roll_window(samples_per_window))
}
