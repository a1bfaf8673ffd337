pub mod data_loop;
pub mod measurement_loop;
pub mod state;

pub use state::{MeasurementRecord, SharedState};
