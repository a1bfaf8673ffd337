pub mod recorder;

pub use recorder::{CsvRecorder, SessionFiles};
