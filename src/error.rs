use thiserror::Error;

use crate::adc::AdcInput;

/// Main error type for the power meter service
#[derive(Error, Debug)]
pub enum MeterError {
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("ADC error: {0}")]
    Adc(#[from] AdcError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Monitoring API error: {0}")]
    Monitoring(String),

    #[error("Measurement task error: {0}")]
    Task(String),
}

/// Errors raised while reading raw samples from an ADC back-end
#[derive(Error, Debug)]
pub enum AdcError {
    #[error("Timed out waiting for a reading on {0}")]
    Timeout(AdcInput),

    #[error("Reading {value} on {input} exceeds the ADC range (max {max})")]
    OutOfRange {
        input: AdcInput,
        value: u32,
        max: u16,
    },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("No more recorded samples for {0}")]
    Exhausted(AdcInput),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Line protocol errors for the serial ADC front-end
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Device reported error: {0}")]
    Device(String),

    #[error("Expected reading for {expected}, got {got}")]
    UnexpectedInput { expected: AdcInput, got: AdcInput },
}
