use std::time::Instant;

use serde::Serialize;

use super::MeterConfig;
use super::averager::WindowAverager;
use super::calculator::WindowCalculator;
use super::calibration::ReferenceCalibrator;
use super::integrator::{Accumulators, integrate_window, prime_offsets};
use super::offset::{ZeroOffsetTracker, ZeroOffsets};
use super::types::{CurrentChannel, Measurement};
use crate::adc::{AdcInput, AdcReader, VOLTS_PER_UNIT};
use crate::error::MeterError;

/// State that lives for exactly one measurement cycle
#[derive(Debug)]
struct CycleState {
    accumulators: Accumulators,
    averager: WindowAverager,
}

/// Calibration and range state of the meter at the end of a cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeterSnapshot {
    pub channel: CurrentChannel,
    pub reference_voltage: f64,
    pub zero_current_volts: f64,
    pub zero_voltage_volts: f64,
}

/// Measurement engine: drives calibration, integration, offset tracking and
/// per-window calculation over one ADC.
///
/// Long-lived state is the calibration ratchet, the offset tracker and the
/// channel selection. Accumulators exist only inside
/// [`PowerMeter::acquire_and_calculate`].
pub struct PowerMeter<A> {
    adc: A,
    config: MeterConfig,
    calculator: WindowCalculator,
    calibrator: ReferenceCalibrator,
    tracker: ZeroOffsetTracker,
    channel: CurrentChannel,
    primed: bool,
}

impl<A: AdcReader> PowerMeter<A> {
    pub fn new(adc: A, config: MeterConfig) -> Result<Self, MeterError> {
        config.validate()?;

        Ok(Self {
            adc,
            calculator: WindowCalculator::new(&config),
            config,
            calibrator: ReferenceCalibrator::new(),
            tracker: ZeroOffsetTracker::new(),
            channel: CurrentChannel::Standard,
            primed: false,
        })
    }

    /// Calibrate once and seed the zero offsets with one raw window
    pub fn begin(&mut self) -> Result<(), MeterError> {
        self.calibrator.calibrate(&mut self.adc)?;
        if !self.calibrator.is_calibrated() {
            tracing::warn!("Internal reference read as zero, readings stay at zero until it recovers");
        }

        let current_input = self.current_input();
        let voltage_input = self.voltage_input();
        let offsets = prime_offsets(
            &mut self.adc,
            current_input,
            voltage_input,
            self.config.samples_per_window,
            &mut self.tracker,
        )?;
        self.primed = true;

        tracing::info!(
            "Meter primed on {}: vref={:.4} V, zero current={:.1}, zero voltage={:.1}",
            self.adc.name(),
            self.calibrator.reference_voltage(),
            offsets.current,
            offsets.voltage
        );

        Ok(())
    }

    /// Run one full measurement cycle of `num_windows` windows and return the
    /// averaged result.
    ///
    /// Each window runs calibrate -> integrate -> offset update -> calculate in
    /// that order. The offsets used by a window are the raw means of the window
    /// before it.
    pub fn acquire_and_calculate(&mut self) -> Result<Measurement, MeterError> {
        if !self.primed {
            self.begin()?;
        }

        let started = Instant::now();
        let mut cycle = CycleState {
            accumulators: Accumulators::default(),
            averager: WindowAverager::new(),
        };
        let samples = self.config.samples_per_window;

        for window in 0..self.config.num_windows {
            self.calibrator.calibrate(&mut self.adc)?;

            let current_input = self.current_input();
            let voltage_input = self.voltage_input();
            integrate_window(
                &mut self.adc,
                current_input,
                voltage_input,
                samples,
                &mut self.tracker,
                &mut cycle.accumulators,
            )?;

            self.tracker.roll_window(samples);

            let result = self.calculator.complete_window(
                &mut cycle.accumulators,
                &mut self.channel,
                self.calibrator.reference_voltage(),
                &mut cycle.averager,
            );

            tracing::trace!("Window {}: {:?}", window, result);
        }

        let elapsed = started.elapsed();
        let measurement = Measurement::new(cycle.averager.average(self.config.num_windows), elapsed);

        tracing::debug!(
            "Cycle: I={:.3} A, V={:.2} V, P={:.2} W, S={:.2} VA, PF={:.3}, {:.3} s",
            measurement.current_rms(),
            measurement.voltage_rms(),
            measurement.real_power(),
            measurement.apparent_power(),
            measurement.power_factor(),
            measurement.elapsed_secs()
        );

        Ok(measurement)
    }

    fn current_input(&self) -> AdcInput {
        match self.channel {
            CurrentChannel::Standard => AdcInput::Pin(self.config.standard_current_pin),
            CurrentChannel::Amplified => AdcInput::Pin(self.config.amplified_current_pin),
        }
    }

    fn voltage_input(&self) -> AdcInput {
        AdcInput::Pin(self.config.voltage_pin)
    }

    pub fn is_amplified(&self) -> bool {
        self.channel.is_amplified()
    }

    pub fn reference_voltage(&self) -> f64 {
        self.calibrator.reference_voltage()
    }

    /// Current channel DC offset, in volts at the ADC pin
    pub fn zero_current_volts(&self) -> f64 {
        self.zero_offsets().current * VOLTS_PER_UNIT * self.reference_voltage()
    }

    /// Voltage channel DC offset, in volts at the ADC pin
    pub fn zero_voltage_volts(&self) -> f64 {
        self.zero_offsets().voltage * VOLTS_PER_UNIT * self.reference_voltage()
    }

    pub fn zero_offsets(&self) -> ZeroOffsets {
        self.tracker.offsets()
    }

    pub fn snapshot(&self) -> MeterSnapshot {
        MeterSnapshot {
            channel: self.channel,
            reference_voltage: self.reference_voltage(),
            zero_current_volts: self.zero_current_volts(),
            zero_voltage_volts: self.zero_voltage_volts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::adc::RawAdcValue;
    use crate::adc::simulated::{SignalProfile, SimulatedAdc};
    use crate::adc::testing::ScriptedAdc;
    use crate::error::AdcError;

    const REF: AdcInput = AdcInput::InternalReference;
    const STANDARD: AdcInput = AdcInput::Pin(0);
    const AMPLIFIED: AdcInput = AdcInput::Pin(1);
    const VOLTAGE: AdcInput = AdcInput::Pin(2);

    fn sim_config(num_windows: u32) -> MeterConfig {
        // 800 samples at 4800 pairs/s cover ten 60 Hz periods
        MeterConfig {
            samples_per_window: 800,
            num_windows,
            ..Default::default()
        }
    }

    fn sim_meter(profile: SignalProfile, num_windows: u32) -> PowerMeter<SimulatedAdc> {
        let config = sim_config(num_windows);
        let adc = SimulatedAdc::new(profile, &config);
        PowerMeter::new(adc, config).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = MeterConfig {
            num_windows: 0,
            ..Default::default()
        };
        assert!(PowerMeter::new(ScriptedAdc::new(), config).is_err());
    }

    #[test]
    fn test_sine_rms_matches_peak_over_sqrt2() {
        let profile = SignalProfile {
            current_rms: 10.0,
            voltage_rms: 120.0,
            ..Default::default()
        };
        let mut meter = sim_meter(profile, 2);
        meter.begin().unwrap();

        let m = meter.acquire_and_calculate().unwrap();

        assert_relative_eq!(m.voltage_rms(), 120.0, max_relative = 0.01);
        assert_relative_eq!(m.current_rms(), 10.0, max_relative = 0.02);
        assert_relative_eq!(m.apparent_power(), 1200.0, max_relative = 0.03);
        // Sequential sampling skews current and voltage by one conversion
        assert!(m.power_factor() > 0.99 && m.power_factor() <= 1.0 + 1e-9);
        assert!(!meter.is_amplified());
    }

    #[test]
    fn test_lagging_load_power_factor() {
        let profile = SignalProfile {
            current_rms: 10.0,
            phase_shift_deg: 60.0,
            ..Default::default()
        };
        let mut meter = sim_meter(profile, 1);

        let m = meter.acquire_and_calculate().unwrap();

        assert_relative_eq!(m.power_factor(), 0.5, epsilon = 0.05);
        assert_relative_eq!(m.real_power(), m.apparent_power() * m.power_factor(), max_relative = 1e-9);
    }

    #[test]
    fn test_low_current_is_measured_on_amplified_input() {
        let profile = SignalProfile {
            current_rms: 1.5,
            ..Default::default()
        };
        let mut meter = sim_meter(profile, 3);
        meter.begin().unwrap();

        let m = meter.acquire_and_calculate().unwrap();

        assert!(meter.is_amplified());
        // Gain is removed before the RMS, so the reading stays in amperes
        assert_relative_eq!(m.current_rms(), 1.5, max_relative = 0.05);
    }

    #[test]
    fn test_rms_never_negative() {
        let profiles = [
            SignalProfile::default(),
            SignalProfile {
                current_rms: 0.0,
                voltage_rms: 0.0,
                ..Default::default()
            },
            SignalProfile {
                voltage_rms: 500.0,
                current_rms: 80.0,
                phase_shift_deg: 170.0,
                ..Default::default()
            },
        ];

        for profile in profiles {
            let mut meter = sim_meter(profile, 2);
            let m = meter.acquire_and_calculate().unwrap();
            assert!(m.current_rms() >= 0.0);
            assert!(m.voltage_rms() >= 0.0);
            assert!(m.power_factor().is_finite());
        }
    }

    #[test]
    fn test_constant_input_gives_zero_rms_after_one_window() {
        let mut adc = ScriptedAdc::new()
            .with_constant(REF, 226)
            .with_constant(STANDARD, 600)
            .with_constant(AMPLIFIED, 600)
            .with_constant(VOLTAGE, 400);
        let config = MeterConfig {
            samples_per_window: 50,
            ..Default::default()
        };
        let calculator = WindowCalculator::new(&config);
        let mut tracker = ZeroOffsetTracker::new();
        let mut acc = Accumulators::default();

        // First window runs against zero offsets
        integrate_window(&mut adc, STANDARD, VOLTAGE, 50, &mut tracker, &mut acc).unwrap();
        let first = calculator.calculate(&acc, CurrentChannel::Standard, 5.0);
        assert!(first.voltage_rms > 0.0);

        let offsets = tracker.roll_window(50);
        assert_relative_eq!(offsets.current, 600.0);
        assert_relative_eq!(offsets.voltage, 400.0);

        acc.reset();
        integrate_window(&mut adc, STANDARD, VOLTAGE, 50, &mut tracker, &mut acc).unwrap();
        let second = calculator.calculate(&acc, CurrentChannel::Standard, 5.0);
        assert_eq!(second.current_rms, 0.0);
        assert_eq!(second.voltage_rms, 0.0);
        assert_eq!(second.power_factor, 0.0);
    }

    #[test]
    fn test_primed_meter_on_dc_reports_zero() {
        let adc = ScriptedAdc::new()
            .with_constant(REF, 226)
            .with_constant(STANDARD, 530)
            .with_constant(AMPLIFIED, 530)
            .with_constant(VOLTAGE, 505);
        let config = MeterConfig {
            samples_per_window: 20,
            num_windows: 2,
            ..Default::default()
        };
        let mut meter = PowerMeter::new(adc, config).unwrap();
        meter.begin().unwrap();

        assert_eq!(meter.zero_offsets(), ZeroOffsets {
            current: 530.0,
            voltage: 505.0
        });
        let m = meter.acquire_and_calculate().unwrap();
        assert_eq!(m.current_rms(), 0.0);
        assert_eq!(m.voltage_rms(), 0.0);
        assert_eq!(m.power_factor(), 0.0);
        assert_relative_eq!(meter.zero_voltage_volts(), 505.0 * meter.reference_voltage() / 1024.0);
    }

    #[test]
    fn test_channel_switches_on_the_window_after_crossing() {
        fn wave(amplitude: RawAdcValue, pairs: usize) -> Vec<RawAdcValue> {
            (0..pairs).flat_map(|_| [512 + amplitude, 512 - amplitude]).collect()
        }

        // One code is ~0.074 A at 5 V / 0.066 V/A; threshold 7 A is ~95 codes
        let mut standard = wave(200, 2); // priming
        standard.extend(wave(200, 2)); // cycle 1: ~14.8 A
        standard.extend(wave(20, 2)); // cycle 2: ~1.5 A, crossing observed here
        let adc = ScriptedAdc::new()
            .with_constant(REF, 226)
            .with_queue(STANDARD, &standard)
            .with_queue(AMPLIFIED, &wave(80, 2)) // cycle 3: 4 x ~1.5 A
            .with_constant(VOLTAGE, 512);
        let config = MeterConfig {
            samples_per_window: 4,
            num_windows: 1,
            ..Default::default()
        };
        let mut meter = PowerMeter::new(adc, config).unwrap();
        meter.begin().unwrap();

        meter.acquire_and_calculate().unwrap();
        assert!(!meter.is_amplified());

        let m = meter.acquire_and_calculate().unwrap();
        assert!(m.current_rms() < 7.0);
        // Selected for the next window, but nothing read from it yet
        assert!(meter.is_amplified());
        assert_eq!(meter.adc.reads_of(AMPLIFIED), 0);

        let m = meter.acquire_and_calculate().unwrap();
        assert_eq!(meter.adc.reads_of(AMPLIFIED), 4);
        assert_relative_eq!(m.current_rms(), 20.0 * 5.0 / 1024.0 / 0.066, max_relative = 0.01);
        assert!(meter.is_amplified());
    }

    #[test]
    fn test_window_order_calibrates_before_sampling() {
        let adc = ScriptedAdc::new()
            .with_constant(REF, 226)
            .with_constant(STANDARD, 512)
            .with_constant(AMPLIFIED, 512)
            .with_constant(VOLTAGE, 512);
        let config = MeterConfig {
            samples_per_window: 2,
            num_windows: 2,
            ..Default::default()
        };
        let mut meter = PowerMeter::new(adc, config).unwrap();

        meter.acquire_and_calculate().unwrap();

        // begin: REF + 2 pairs; each window: REF + 2 pairs
        let reads = &meter.adc.reads;
        assert_eq!(reads.len(), 15);
        assert_eq!(reads[0], REF);
        assert_eq!(reads[5], REF);
        assert_eq!(reads[10], REF);
    }

    #[test]
    fn test_ratchet_survives_cycles() {
        let adc = ScriptedAdc::new()
            .with_queue(REF, &[230, 220, 240])
            .with_constant(STANDARD, 512)
            .with_constant(AMPLIFIED, 512)
            .with_constant(VOLTAGE, 512);
        let config = MeterConfig {
            samples_per_window: 2,
            num_windows: 1,
            ..Default::default()
        };
        let mut meter = PowerMeter::new(adc, config).unwrap();

        meter.begin().unwrap();
        meter.acquire_and_calculate().unwrap();
        let after_220 = meter.reference_voltage();
        assert_relative_eq!(after_220, 1.1034 * 1024.0 / 220.0);

        meter.acquire_and_calculate().unwrap();
        assert_eq!(meter.reference_voltage(), after_220);
    }

    #[test]
    fn test_identical_input_gives_identical_results() {
        let profile = SignalProfile {
            current_rms: 4.0,
            phase_shift_deg: 25.0,
            ..Default::default()
        };

        let mut first = sim_meter(profile.clone(), 3);
        first.begin().unwrap();
        let a = first.acquire_and_calculate().unwrap();

        // Fresh meter and signal, carrying over only the calibration ratchet
        let mut second = sim_meter(profile, 3);
        second.calibrator = first.calibrator.clone();
        second.begin().unwrap();
        let b = second.acquire_and_calculate().unwrap();

        assert_eq!(a.values(), b.values());
    }

    #[test]
    fn test_adc_failure_aborts_cycle() {
        let adc = ScriptedAdc::new()
            .with_constant(REF, 226)
            .with_queue(STANDARD, &[512; 3])
            .with_constant(VOLTAGE, 512);
        let config = MeterConfig {
            samples_per_window: 2,
            ..Default::default()
        };
        let mut meter = PowerMeter::new(adc, config).unwrap();

        let err = meter.acquire_and_calculate().unwrap_err();
        assert!(matches!(err, MeterError::Adc(AdcError::Exhausted(STANDARD))));
    }

    #[test]
    fn test_snapshot() {
        let mut meter = sim_meter(SignalProfile::default(), 1);
        meter.acquire_and_calculate().unwrap();

        let snapshot = meter.snapshot();
        assert_eq!(snapshot.channel, CurrentChannel::Amplified);
        assert_relative_eq!(snapshot.reference_voltage, 4.9994, epsilon = 1e-3);
        assert_relative_eq!(snapshot.zero_voltage_volts, 2.5, epsilon = 0.01);
        assert_eq!(meter.zero_current_volts(), snapshot.zero_current_volts);
    }
}
