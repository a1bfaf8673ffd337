use std::f64::consts::{PI, SQRT_2};

use super::{ADC_FULL_SCALE, ADC_MAX_VALUE, AdcInput, AdcReader, RawAdcValue};
use crate::error::AdcError;
use crate::measure::MeterConfig;
use crate::measure::calibration::INTERNAL_REFERENCE_VOLTS;

/// Electrical scenario fed to the simulated converter
#[derive(Debug, Clone, PartialEq)]
pub struct SignalProfile {
    /// Line frequency in Hz
    pub frequency_hz: f64,
    /// RMS line voltage in volts
    pub voltage_rms: f64,
    /// RMS load current in amperes
    pub current_rms: f64,
    /// Current lag behind voltage, in degrees
    pub phase_shift_deg: f64,
    /// True supply rail seen by the converter, in volts
    pub supply_volts: f64,
    /// Conversions per second
    pub conversion_rate_hz: f64,
    /// DC bias of every analog input, in ADC codes
    pub dc_bias: f64,
}

impl Default for SignalProfile {
    fn default() -> Self {
        Self {
            frequency_hz: 60.0,
            voltage_rms: 120.0,
            current_rms: 3.0,
            phase_shift_deg: 0.0,
            supply_volts: 5.0,
            conversion_rate_hz: 9600.0,
            dc_bias: 512.0,
        }
    }
}

/// Converter producing sine waves for the configured meter wiring.
///
/// Time advances by one conversion period on every read, so consecutive current
/// and voltage reads are skewed by one conversion like on real hardware.
pub struct SimulatedAdc {
    profile: SignalProfile,
    standard_pin: u8,
    amplified_pin: u8,
    voltage_pin: u8,
    current_gain: f64,
    counts_per_amp: f64,
    counts_per_volt: f64,
    reference_counts: RawAdcValue,
    tick: u64,
}

impl SimulatedAdc {
    pub fn new(profile: SignalProfile, meter: &MeterConfig) -> Self {
        let volts_per_count = profile.supply_volts / ADC_FULL_SCALE;
        let reference_counts = (INTERNAL_REFERENCE_VOLTS / volts_per_count)
            .round()
            .clamp(0.0, ADC_MAX_VALUE as f64) as RawAdcValue;

        Self {
            standard_pin: meter.standard_current_pin,
            amplified_pin: meter.amplified_current_pin,
            voltage_pin: meter.voltage_pin,
            current_gain: meter.current_gain,
            counts_per_amp: meter.sensor_sensitivity / volts_per_count,
            counts_per_volt: meter.voltage_measuring_ratio / volts_per_count,
            reference_counts,
            profile,
            tick: 0,
        }
    }

    /// Code reported for the internal reference at the simulated supply
    #[cfg(test)]
    pub fn reference_counts(&self) -> RawAdcValue {
        self.reference_counts
    }

    /// Restart the waveforms at phase zero
    #[cfg(test)]
    pub fn rewind(&mut self) {
        self.tick = 0;
    }

    fn quantize(&self, ac_counts: f64) -> RawAdcValue {
        (self.profile.dc_bias + ac_counts)
            .round()
            .clamp(0.0, ADC_MAX_VALUE as f64) as RawAdcValue
    }
}

impl AdcReader for SimulatedAdc {
    fn read(&mut self, input: AdcInput) -> Result<RawAdcValue, AdcError> {
        let t = self.tick as f64 / self.profile.conversion_rate_hz;
        self.tick += 1;

        let omega_t = 2.0 * PI * self.profile.frequency_hz * t;
        let current = self.profile.current_rms
            * SQRT_2
            * (omega_t - self.profile.phase_shift_deg.to_radians()).sin();

        let value = match input {
            AdcInput::InternalReference => self.reference_counts,
            AdcInput::Pin(pin) if pin == self.voltage_pin => {
                let voltage = self.profile.voltage_rms * SQRT_2 * omega_t.sin();
                self.quantize(voltage * self.counts_per_volt)
            }
            AdcInput::Pin(pin) if pin == self.standard_pin => {
                self.quantize(current * self.counts_per_amp)
            }
            AdcInput::Pin(pin) if pin == self.amplified_pin => {
                self.quantize(current * self.counts_per_amp * self.current_gain)
            }
            // Unconnected inputs float at the bias level
            AdcInput::Pin(_) => self.quantize(0.0),
        };

        Ok(value)
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
