use super::types::WindowResult;

/// Running sums of window results, averaged once per cycle
#[derive(Debug, Clone, Default)]
pub struct WindowAverager {
    sums: WindowResult,
    windows: u32,
}

impl WindowAverager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, result: &WindowResult) {
        self.sums.current_rms += result.current_rms;
        self.sums.voltage_rms += result.voltage_rms;
        self.sums.real_power += result.real_power;
        self.sums.apparent_power += result.apparent_power;
        self.sums.power_factor += result.power_factor;
        self.windows += 1;
    }

    /// Windows added since the last average
    #[cfg(test)]
    pub fn windows(&self) -> u32 {
        self.windows
    }

    /// Arithmetic mean over `num_windows`, then clear the sums
    pub fn average(&mut self, num_windows: u32) -> WindowResult {
        let n = num_windows as f64;
        let mean = WindowResult {
            current_rms: self.sums.current_rms / n,
            voltage_rms: self.sums.voltage_rms / n,
            real_power: self.sums.real_power / n,
            apparent_power: self.sums.apparent_power / n,
            power_factor: self.sums.power_factor / n,
        };

        *self = Self::default();

        mean
    }
}
