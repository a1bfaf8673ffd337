use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MeterError;

/// Wiring and conversion parameters of one meter, fixed after construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    /// Current sensor output wired straight to the ADC
    pub standard_current_pin: u8,
    /// Current sensor output after the amplifier stage
    pub amplified_current_pin: u8,
    /// Voltage divider output
    pub voltage_pin: u8,
    /// Sensor full-range current in amperes (ACS712: 5 | 20 | 30)
    pub max_current: f64,
    /// Gain of the amplified current input
    pub current_gain: f64,
    /// Sensor sensitivity in volts per ampere (ACS712: 0.185 | 0.100 | 0.066)
    pub sensor_sensitivity: f64,
    /// Volts at the ADC per volt on the line
    pub voltage_measuring_ratio: f64,
    /// Samples integrated per window
    pub samples_per_window: u32,
    /// Windows averaged per reported measurement
    pub num_windows: u32,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            standard_current_pin: 0,
            amplified_current_pin: 1,
            voltage_pin: 2,
            max_current: 30.0,
            current_gain: 4.0,
            sensor_sensitivity: 0.066,
            // 5 V span over -Vp..+Vp of a 127 V RMS grid
            voltage_measuring_ratio: 5.0 / (2.0 * 127.0 * std::f64::consts::SQRT_2),
            samples_per_window: 5000,
            num_windows: 1,
        }
    }
}

impl MeterConfig {
    /// Load from a TOML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self, MeterError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// RMS current below which the amplified input is selected, whole amperes
    /// only: 30 A over a gain of 4 gives 7 A
    pub fn shift_threshold(&self) -> f64 {
        (self.max_current / self.current_gain).trunc()
    }

    pub fn validate(&self) -> Result<(), MeterError> {
        if self.samples_per_window == 0 {
            return Err(MeterError::Config("samples_per_window must be at least 1".into()));
        }
        if self.num_windows == 0 {
            return Err(MeterError::Config("num_windows must be at least 1".into()));
        }

        for (name, value) in [
            ("max_current", self.max_current),
            ("current_gain", self.current_gain),
            ("sensor_sensitivity", self.sensor_sensitivity),
            ("voltage_measuring_ratio", self.voltage_measuring_ratio),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(MeterError::Config(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        let pins = [
            self.standard_current_pin,
            self.amplified_current_pin,
            self.voltage_pin,
        ];
        if pins[0] == pins[1] || pins[0] == pins[2] || pins[1] == pins[2] {
            return Err(MeterError::Config(format!(
                "standard current, amplified current and voltage pins must differ, got {:?}",
                pins
            )));
        }

        Ok(())
    }
}
