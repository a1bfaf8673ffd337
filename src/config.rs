use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::adc::AdcSourceConfig;
use crate::adc::simulated::SignalProfile;
use crate::error::MeterError;
use crate::measure::MeterConfig;

#[derive(Parser, Debug)]
#[command(name = "power-meter-service")]
#[command(about = "Single-phase AC Power Meter Service")]
#[command(version)]
pub struct Cli {
    /// HTTP server port
    #[arg(short, long, default_value = "8100")]
    pub listen: u16,

    /// HTTP server host
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// List available serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Meter wiring and conversion settings (TOML)
    #[arg(short, long, env = "POWER_METER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Samples per window, overrides the config file
    #[arg(long)]
    pub samples: Option<u32>,

    /// Windows averaged per measurement, overrides the config file
    #[arg(long)]
    pub windows: Option<u32>,

    /// Directory holding recording sessions
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Pause between measurement cycles in milliseconds
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,

    /// Monitoring API to push measurements to, without waiting for /register
    #[arg(long, requires = "meter_id")]
    pub monitoring_url: Option<String>,

    /// Meter ID assigned by the monitoring system
    #[arg(long)]
    pub meter_id: Option<String>,

    #[command(subcommand)]
    pub mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Mode {
    /// Read an ADC front-end over a serial port
    Serial(SerialArgs),

    /// Replay a capture file
    Playback(PlaybackArgs),

    /// Generate synthetic line voltage and load current
    Simulate(SimulateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SerialArgs {
    /// Serial port device path (e.g., COM3 on Windows, /dev/ttyUSB0 on Linux)
    #[arg(short, long)]
    pub device: String,

    /// Baud rate
    #[arg(short, long, default_value = "115200")]
    pub baud: u32,

    /// Give up on a conversion after this many milliseconds
    #[arg(long, default_value = "1000")]
    pub timeout_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct PlaybackArgs {
    /// Path to capture file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Loop playback when file ends
    #[arg(long, default_value = "false")]
    pub loop_playback: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Line frequency in Hz
    #[arg(long, default_value = "60")]
    pub frequency: f64,

    /// RMS line voltage
    #[arg(long, default_value = "120")]
    pub voltage: f64,

    /// RMS load current
    #[arg(long, default_value = "3")]
    pub current: f64,

    /// Current lag behind voltage in degrees
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub phase: f64,

    /// Supply rail of the simulated converter in volts
    #[arg(long, default_value = "5")]
    pub supply: f64,
}

impl Cli {
    /// Convert CLI args to AdcSourceConfig
    pub fn to_adc_source_config(&self) -> Option<AdcSourceConfig> {
        match &self.mode {
            Some(Mode::Serial(args)) => Some(AdcSourceConfig::Serial {
                port: args.device.clone(),
                baud_rate: args.baud,
                read_timeout: Duration::from_millis(args.timeout_ms),
            }),
            Some(Mode::Playback(args)) => Some(AdcSourceConfig::Playback {
                capture_file: args.file.clone(),
                loop_playback: args.loop_playback,
            }),
            Some(Mode::Simulate(args)) => Some(AdcSourceConfig::Simulated(SignalProfile {
                frequency_hz: args.frequency,
                voltage_rms: args.voltage,
                current_rms: args.current,
                phase_shift_deg: args.phase,
                supply_volts: args.supply,
                ..Default::default()
            })),
            None => None,
        }
    }

    /// Meter settings from the config file (or defaults) with CLI overrides
    pub fn to_meter_config(&self) -> Result<MeterConfig, MeterError> {
        let mut config = match &self.config {
            Some(path) => MeterConfig::load(path)?,
            None => MeterConfig::default(),
        };

        if let Some(samples) = self.samples {
            config.samples_per_window = samples;
        }
        if let Some(windows) = self.windows {
            config.num_windows = windows;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
