use serde::Serialize;

use crate::adc::RawAdcValue;

/// DC bias of the two channels, in raw ADC codes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ZeroOffsets {
    pub current: f64,
    pub voltage: f64,
}

/// Zero-offset tracker with an explicit one-window lag.
///
/// `offsets` are subtracted from every sample of window *k*; `pending_*` sum the
/// raw samples of window *k* and become the offsets of window *k + 1* when
/// [`ZeroOffsetTracker::roll_window`] runs between the two.
#[derive(Debug, Clone, Default)]
pub struct ZeroOffsetTracker {
    offsets: ZeroOffsets,
    pending_current: f64,
    pending_voltage: f64,
}

impl ZeroOffsetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offsets in effect for the window being integrated
    pub fn offsets(&self) -> ZeroOffsets {
        self.offsets
    }

    /// Add one raw sample pair to the sums feeding the next window
    pub fn observe(&mut self, current: RawAdcValue, voltage: RawAdcValue) {
        self.pending_current += current as f64;
        self.pending_voltage += voltage as f64;
    }

    /// Replace the offsets with the means of the window just observed and
    /// clear the sums.
    pub fn roll_window(&mut self, samples_per_window: u32) -> ZeroOffsets {
        let n = samples_per_window as f64;
        self.offsets = ZeroOffsets {
            current: self.pending_current / n,
            voltage: self.pending_voltage / n,
        };
        self.pending_current = 0.0;
        self.pending_voltage = 0.0;

        tracing::trace!(
            "Zero offsets: current={:.2}, voltage={:.2}",
            self.offsets.current,
            self.offsets.voltage
        );

        self.offsets
    }

    #[cfg(test)]
    pub fn has_pending(&self) -> bool {
        self.pending_current != 0.0 || self.pending_voltage != 0.0
    }
}
