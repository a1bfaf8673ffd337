use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Current sensing input in use for a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentChannel {
    #[default]
    Standard,
    Amplified,
}

impl CurrentChannel {
    pub fn is_amplified(&self) -> bool {
        matches!(self, CurrentChannel::Amplified)
    }
}

/// RMS and power values of one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WindowResult {
    pub current_rms: f64,
    pub voltage_rms: f64,
    pub real_power: f64,
    pub apparent_power: f64,
    pub power_factor: f64,
}

/// Averaged result of one measurement cycle, the only value leaving the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    current_rms: f64,
    voltage_rms: f64,
    real_power: f64,
    apparent_power: f64,
    power_factor: f64,
    /// Wall time of the whole cycle, in seconds
    elapsed_secs: f64,
}

impl Measurement {
    pub(crate) fn new(average: WindowResult, elapsed: Duration) -> Self {
        Self {
            current_rms: average.current_rms,
            voltage_rms: average.voltage_rms,
            real_power: average.real_power,
            apparent_power: average.apparent_power,
            power_factor: average.power_factor,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }

    /// Amperes
    pub fn current_rms(&self) -> f64 {
        self.current_rms
    }

    /// Volts
    pub fn voltage_rms(&self) -> f64 {
        self.voltage_rms
    }

    /// Watts
    pub fn real_power(&self) -> f64 {
        self.real_power
    }

    /// Volt-amperes
    pub fn apparent_power(&self) -> f64 {
        self.apparent_power
    }

    pub fn power_factor(&self) -> f64 {
        self.power_factor
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    /// The five electrical values, without the cycle time
    #[cfg(test)]
    pub fn values(&self) -> WindowResult {
        WindowResult {
            current_rms: self.current_rms,
            voltage_rms: self.voltage_rms,
            real_power: self.real_power,
            apparent_power: self.apparent_power,
            power_factor: self.power_factor,
        }
    }
}
