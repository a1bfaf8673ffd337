use chrono::{DateTime, Local};

/// Wall clock used to stamp measurements and name daily files
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Local system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// `DD/MM/YYYY`
pub fn format_date(timestamp: &DateTime<Local>) -> String {
    timestamp.format("%d/%m/%Y").to_string()
}

/// `hh:mm:ss`, 24-hour
pub fn format_time(timestamp: &DateTime<Local>) -> String {
    timestamp.format("%H:%M:%S").to_string()
}

/// Name of the data file holding `timestamp`'s day: `YYYYMMDD.csv`
pub fn daily_file_name(timestamp: &DateTime<Local>) -> String {
    timestamp.format("%Y%m%d.csv").to_string()
}
