pub mod playback;
pub mod protocol;
pub mod serial;
pub mod simulated;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AdcError, MeterError};
use crate::measure::MeterConfig;

/// Raw ADC conversion result (10-bit, 0-1023)
pub type RawAdcValue = u16;

/// Resolution of the converter in bits
pub const ADC_RESOLUTION_BITS: u32 = 10;

/// Number of codes spanning the reference voltage
pub const ADC_FULL_SCALE: f64 = (1u32 << ADC_RESOLUTION_BITS) as f64;

/// Maximum valid ADC value
pub const ADC_MAX_VALUE: RawAdcValue = (1 << ADC_RESOLUTION_BITS) - 1;

/// Volts per ADC code, to be multiplied by the calibrated reference voltage
pub const VOLTS_PER_UNIT: f64 = 1.0 / ADC_FULL_SCALE;

/// Input selector for a single conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdcInput {
    /// Analog input pin
    Pin(u8),
    /// Fixed internal band-gap reference, measured against the supply rail
    InternalReference,
}

impl fmt::Display for AdcInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdcInput::Pin(pin) => write!(f, "A{}", pin),
            AdcInput::InternalReference => write!(f, "REF"),
        }
    }
}

/// Capability interface over the analog-to-digital converter.
///
/// Every call performs one blocking conversion. Implementations must bound the
/// wait and return [`AdcError::Timeout`] rather than block forever.
pub trait AdcReader: Send {
    /// Perform one conversion on the selected input
    fn read(&mut self, input: AdcInput) -> Result<RawAdcValue, AdcError>;

    /// Name of this back-end for logging
    fn name(&self) -> &str;
}

impl<A: AdcReader + ?Sized> AdcReader for Box<A> {
    fn read(&mut self, input: AdcInput) -> Result<RawAdcValue, AdcError> {
        (**self).read(input)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Reject readings outside the converter range
pub fn check_range(input: AdcInput, value: u32) -> Result<RawAdcValue, AdcError> {
    if value > ADC_MAX_VALUE as u32 {
        return Err(AdcError::OutOfRange {
            input,
            value,
            max: ADC_MAX_VALUE,
        });
    }
    Ok(value as RawAdcValue)
}

/// Configuration for creating ADC back-ends
#[derive(Debug, Clone)]
pub enum AdcSourceConfig {
    /// Serial-attached ADC front-end
    Serial {
        port: String,
        baud_rate: u32,
        read_timeout: Duration,
    },
    /// Replay of a capture file
    Playback {
        capture_file: PathBuf,
        loop_playback: bool,
    },
    /// Synthetic sine waves
    Simulated(simulated::SignalProfile),
}

impl AdcSourceConfig {
    /// Create an ADC reader from this configuration
    pub fn create_reader(&self, meter: &MeterConfig) -> Result<Box<dyn AdcReader>, MeterError> {
        let reader: Box<dyn AdcReader> = match self {
            AdcSourceConfig::Serial {
                port,
                baud_rate,
                read_timeout,
            } => Box::new(serial::SerialAdc::open(port, *baud_rate, *read_timeout)?),
            AdcSourceConfig::Playback {
                capture_file,
                loop_playback,
            } => Box::new(playback::PlaybackAdc::open(capture_file, *loop_playback)?),
            AdcSourceConfig::Simulated(profile) => {
                Box::new(simulated::SimulatedAdc::new(profile.clone(), meter))
            }
        };

        tracing::info!("Using ADC back-end {}", reader.name());

        Ok(reader)
    }
}
