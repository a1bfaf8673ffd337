use super::MeterConfig;
use super::averager::WindowAverager;
use super::integrator::Accumulators;
use super::types::{CurrentChannel, WindowResult};
use crate::adc::VOLTS_PER_UNIT;

/// Power factor with the zero-load case pinned to `0.0`
pub fn power_factor(real_power: f64, apparent_power: f64) -> f64 {
    if apparent_power == 0.0 {
        return 0.0;
    }
    real_power / apparent_power
}

/// Converts one window of accumulated sums into physical units
#[derive(Debug, Clone)]
pub struct WindowCalculator {
    samples_per_window: f64,
    sensor_sensitivity: f64,
    voltage_measuring_ratio: f64,
    current_gain: f64,
    shift_threshold: f64,
}

impl WindowCalculator {
    pub fn new(config: &MeterConfig) -> Self {
        Self {
            samples_per_window: config.samples_per_window as f64,
            sensor_sensitivity: config.sensor_sensitivity,
            voltage_measuring_ratio: config.voltage_measuring_ratio,
            current_gain: config.current_gain,
            shift_threshold: config.shift_threshold(),
        }
    }

    /// RMS and power values for `acc`, sampled on `channel` with the rail at
    /// `reference_voltage`
    pub fn calculate(
        &self,
        acc: &Accumulators,
        channel: CurrentChannel,
        reference_voltage: f64,
    ) -> WindowResult {
        let mut sum_sqr_current = acc.sum_sqr_current;
        let mut sum_inst_power = acc.sum_inst_power;

        // Squared sum carries the gain squared
        if channel.is_amplified() {
            sum_sqr_current /= self.current_gain * self.current_gain;
            sum_inst_power /= self.current_gain;
        }

        let n = self.samples_per_window;
        let volts_per_code = VOLTS_PER_UNIT * reference_voltage;

        let current_rms = (sum_sqr_current / n).sqrt() * volts_per_code / self.sensor_sensitivity;
        let voltage_rms =
            (acc.sum_sqr_voltage / n).sqrt() * volts_per_code / self.voltage_measuring_ratio;
        let real_power = sum_inst_power * volts_per_code * volts_per_code
            / (self.sensor_sensitivity * self.voltage_measuring_ratio * n);
        let apparent_power = voltage_rms * current_rms;

        WindowResult {
            current_rms,
            voltage_rms,
            real_power,
            apparent_power,
            power_factor: power_factor(real_power, apparent_power),
        }
    }

    /// Input for the next window: amplified below the shift threshold,
    /// standard otherwise. Single threshold, no hysteresis.
    pub fn next_channel(&self, current_rms: f64) -> CurrentChannel {
        if current_rms < self.shift_threshold {
            CurrentChannel::Amplified
        } else {
            CurrentChannel::Standard
        }
    }

    /// Close a window: compute its values, hand them to the averager, clear the
    /// accumulators and select the input for the next window.
    pub fn complete_window(
        &self,
        acc: &mut Accumulators,
        channel: &mut CurrentChannel,
        reference_voltage: f64,
        averager: &mut WindowAverager,
    ) -> WindowResult {
        let result = self.calculate(acc, *channel, reference_voltage);

        averager.add(&result);
        acc.reset();

        let next = self.next_channel(result.current_rms);
        if next != *channel {
            tracing::info!(
                "Current {:.3} A vs threshold {:.3} A: switching {:?} -> {:?}",
                result.current_rms,
                self.shift_threshold,
                channel,
                next
            );
            *channel = next;
        }

        result
    }

    #[cfg(test)]
    pub fn shift_threshold(&self) -> f64 {
        self.shift_threshold
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn config() -> MeterConfig {
        MeterConfig {
            samples_per_window: 100,
            sensor_sensitivity: 0.1,
            voltage_measuring_ratio: 0.01,
            current_gain: 4.0,
            max_current: 20.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_power_factor_zero_apparent_power() {
        assert_eq!(power_factor(0.0, 0.0), 0.0);
        assert_eq!(power_factor(5.0, 0.0), 0.0);
        assert_relative_eq!(power_factor(50.0, 100.0), 0.5);
        assert_relative_eq!(power_factor(-50.0, 100.0), -0.5);
    }

    #[test]
    fn test_calculate_standard_channel() {
        let calc = WindowCalculator::new(&config());
        // 100 samples of +-10 codes current, +-200 codes voltage, in phase
        let acc = Accumulators {
            sum_sqr_current: 100.0 * 100.0,
            sum_sqr_voltage: 100.0 * 40_000.0,
            sum_inst_power: 100.0 * 2000.0,
        };

        // 1024 V rail makes one code worth one volt
        let result = calc.calculate(&acc, CurrentChannel::Standard, 1024.0);

        assert_relative_eq!(result.current_rms, 10.0 / 0.1, epsilon = 1e-9);
        assert_relative_eq!(result.voltage_rms, 200.0 / 0.01, epsilon = 1e-9);
        assert_relative_eq!(result.real_power, 2000.0 / (0.1 * 0.01), epsilon = 1e-6);
        assert_relative_eq!(result.apparent_power, result.voltage_rms * result.current_rms);
        assert_relative_eq!(result.power_factor, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_calculate_amplified_removes_gain() {
        let calc = WindowCalculator::new(&config());
        let standard = Accumulators {
            sum_sqr_current: 100.0 * 25.0,
            sum_sqr_voltage: 100.0 * 10_000.0,
            sum_inst_power: 100.0 * 500.0,
        };
        // Same signal seen through the x4 amplifier
        let amplified = Accumulators {
            sum_sqr_current: standard.sum_sqr_current * 16.0,
            sum_sqr_voltage: standard.sum_sqr_voltage,
            sum_inst_power: standard.sum_inst_power * 4.0,
        };

        let a = calc.calculate(&standard, CurrentChannel::Standard, 5.0);
        let b = calc.calculate(&amplified, CurrentChannel::Amplified, 5.0);

        assert_relative_eq!(a.current_rms, b.current_rms, epsilon = 1e-12);
        assert_relative_eq!(a.real_power, b.real_power, epsilon = 1e-12);
        assert_relative_eq!(a.voltage_rms, b.voltage_rms);
    }

    #[test]
    fn test_zero_accumulators_give_zero_results() {
        let calc = WindowCalculator::new(&config());
        let result = calc.calculate(&Accumulators::default(), CurrentChannel::Standard, 5.0);

        assert_eq!(result.current_rms, 0.0);
        assert_eq!(result.voltage_rms, 0.0);
        assert_eq!(result.apparent_power, 0.0);
        assert_eq!(result.power_factor, 0.0);
    }

    #[test]
    fn test_next_channel_single_threshold() {
        let calc = WindowCalculator::new(&config());
        assert_relative_eq!(calc.shift_threshold(), 5.0);

        assert_eq!(calc.next_channel(0.0), CurrentChannel::Amplified);
        assert_eq!(calc.next_channel(4.999), CurrentChannel::Amplified);
        assert_eq!(calc.next_channel(5.0), CurrentChannel::Standard);
        assert_eq!(calc.next_channel(12.0), CurrentChannel::Standard);
    }

    #[test]
    fn test_default_threshold_truncates_to_whole_amperes() {
        let calc = WindowCalculator::new(&MeterConfig::default());
        assert_relative_eq!(calc.shift_threshold(), 7.0);

        // 30 A / 4 is 7.5, but 7.2 A still stays on the standard input
        assert_eq!(calc.next_channel(7.2), CurrentChannel::Standard);
        assert_eq!(calc.next_channel(7.0), CurrentChannel::Standard);
        assert_eq!(calc.next_channel(6.99), CurrentChannel::Amplified);
    }

    #[test]
    fn test_complete_window_side_effects() {
        let calc = WindowCalculator::new(&config());
        let mut acc = Accumulators {
            sum_sqr_current: 100.0,
            sum_sqr_voltage: 100.0,
            sum_inst_power: 100.0,
        };
        let mut channel = CurrentChannel::Standard;
        let mut averager = WindowAverager::new();

        let result = calc.complete_window(&mut acc, &mut channel, 5.0, &mut averager);

        assert!(acc.is_zero());
        assert_eq!(averager.windows(), 1);
        // Tiny current selects the amplified input for the next window
        assert!(result.current_rms < calc.shift_threshold());
        assert_eq!(channel, CurrentChannel::Amplified);
    }
}
