pub mod averager;
pub mod calculator;
pub mod calibration;
pub mod config;
pub mod integrator;
pub mod meter;
pub mod offset;
pub mod types;

pub use config::MeterConfig;
pub use meter::{MeterSnapshot, PowerMeter};
pub use types::{CurrentChannel, Measurement};
