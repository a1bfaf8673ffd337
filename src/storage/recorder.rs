use std::io::ErrorKind;
use std::path::PathBuf;

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::clock::{daily_file_name, format_date, format_time};
use crate::error::MeterError;
use crate::service::MeasurementRecord;

/// CSV field separator
pub const SEPARATOR: &str = ";";

/// Column header, sent ahead of a file on transfer
pub const DATA_HEADER: &str =
    "date;time;current(A);voltage(V);realPower(W);apparentPower(VA);powerFactor;windowTime(s)";

/// File at the data root naming the session to resume after a restart
pub const AUTOCONFIG_FILE: &str = "autoconfig.txt";

/// Significant digits of every numeric field
pub const SIGNIFICANT_DIGITS: usize = 4;

const MAX_NAME_LEN: usize = 32;

/// Files stored under one session directory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionFiles {
    pub session: String,
    pub files: Vec<String>,
}

/// Format like a stream with `setprecision(digits)`: `%g` style, trailing zeros
/// dropped, exponent notation outside `1e-4..1e<digits>`.
pub fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    let digits = digits.max(1);
    // Rounded scientific form decides the exponent, 9999.7 -> 1.000e4
    let scientific = format!("{:.*e}", digits - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// One CSV row for `record`, newline included
pub fn format_row(record: &MeasurementRecord) -> String {
    let m = &record.measurement;
    let fields = [
        format_date(&record.timestamp),
        format_time(&record.timestamp),
        format_significant(m.current_rms(), SIGNIFICANT_DIGITS),
        format_significant(m.voltage_rms(), SIGNIFICANT_DIGITS),
        format_significant(m.real_power(), SIGNIFICANT_DIGITS),
        format_significant(m.apparent_power(), SIGNIFICANT_DIGITS),
        format_significant(m.power_factor(), SIGNIFICANT_DIGITS),
        format_significant(m.elapsed_secs(), SIGNIFICANT_DIGITS),
    ];

    let mut row = fields.join(SEPARATOR);
    row.push('\n');
    row
}

/// Session and file names are single path components
fn check_name(name: &str, allow_dot: bool) -> Result<(), MeterError> {
    let valid_char =
        |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_' || (allow_dot && c == '.');

    if name.is_empty()
        || name.len() > MAX_NAME_LEN
        || name.starts_with('.')
        || !name.chars().all(valid_char)
    {
        return Err(MeterError::Storage(format!("Invalid name: {:?}", name)));
    }
    Ok(())
}

/// Measurement store: one directory per session, one CSV file per day
#[derive(Debug, Clone)]
pub struct CsvRecorder {
    root: PathBuf,
}

impl CsvRecorder {
    /// Open the store at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, MeterError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;

        tracing::info!("Data directory: {}", root.display());
        Ok(Self { root })
    }

    fn session_dir(&self, session: &str) -> Result<PathBuf, MeterError> {
        check_name(session, false)?;
        Ok(self.root.join(session))
    }

    /// Create the session directory; an existing one is reused
    pub async fn make_session_dir(&self, session: &str) -> Result<PathBuf, MeterError> {
        let dir = self.session_dir(session)?;
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Append `record` to the session's file for the record's day
    pub async fn record(
        &self,
        session: &str,
        record: &MeasurementRecord,
    ) -> Result<PathBuf, MeterError> {
        let dir = self.session_dir(session)?;
        if !fs::try_exists(&dir).await? {
            return Err(MeterError::Storage(format!("Session {} does not exist", session)));
        }

        let path = dir.join(daily_file_name(&record.timestamp));
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(format_row(record).as_bytes()).await?;
        file.flush().await?;

        tracing::trace!("Recorded to {}", path.display());
        Ok(path)
    }

    pub async fn save_active_session(&self, session: &str) -> Result<(), MeterError> {
        check_name(session, false)?;
        fs::write(self.root.join(AUTOCONFIG_FILE), session).await?;
        Ok(())
    }

    /// Session saved by [`CsvRecorder::save_active_session`], if its directory
    /// still exists
    pub async fn restore_session(&self) -> Result<Option<String>, MeterError> {
        let contents = match fs::read_to_string(self.root.join(AUTOCONFIG_FILE)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let Some(session) = contents.lines().next().map(str::trim) else {
            return Ok(None);
        };

        let dir = self.session_dir(session)?;
        if !fs::try_exists(&dir).await? {
            tracing::warn!("Saved session {} has no directory, ignoring", session);
            return Ok(None);
        }

        Ok(Some(session.to_string()))
    }

    /// Remove the autoconfig file; a missing file is not an error
    pub async fn delete_autoconfig(&self) -> Result<(), MeterError> {
        match fs::remove_file(self.root.join(AUTOCONFIG_FILE)).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Header line followed by the stored rows of `session/file`
    pub async fn transfer_file(&self, session: &str, file: &str) -> Result<String, MeterError> {
        check_name(file, true)?;
        let path = self.session_dir(session)?.join(file);
        let contents = fs::read_to_string(&path).await?;

        let mut out = String::with_capacity(DATA_HEADER.len() + 1 + contents.len());
        out.push_str(DATA_HEADER);
        out.push('\n');
        out.push_str(&contents);
        Ok(out)
    }

    /// Every session directory and its files, sorted by name
    pub async fn list_files(&self) -> Result<Vec<SessionFiles>, MeterError> {
        let mut sessions = Vec::new();

        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }

            let mut files = Vec::new();
            let mut session_entries = fs::read_dir(entry.path()).await?;
            while let Some(file) = session_entries.next_entry().await? {
                if file.file_type().await?.is_file() {
                    files.push(file.file_name().to_string_lossy().into_owned());
                }
            }
            files.sort();

            sessions.push(SessionFiles {
                session: entry.file_name().to_string_lossy().into_owned(),
                files,
            });
        }

        sessions.sort_by(|a, b| a.session.cmp(&b.session));
        Ok(sessions)
    }
}
