use std::io::{BufRead, BufReader, Write};
use std::time::Duration;

use serialport::SerialPort;

use super::protocol::{expect_reading, parse_line, read_command};
use super::{AdcInput, AdcReader, RawAdcValue, check_range};
use crate::error::{AdcError, MeterError};

/// Lines skipped while waiting for the reply to one request before giving up
const MAX_NOISE_LINES: usize = 8;

/// ADC front-end attached over a serial port.
///
/// Each conversion is one request/response exchange; the port read timeout
/// bounds the wait.
pub struct SerialAdc {
    port_name: String,
    reader: BufReader<Box<dyn SerialPort>>,
    line_buf: String,
}

impl SerialAdc {
    pub fn open(port_name: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, MeterError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(read_timeout)
            .open()?;

        tracing::info!(
            "Serial ADC opened on {} at {} baud (timeout {:?})",
            port_name,
            baud_rate,
            read_timeout
        );

        Ok(Self {
            port_name: port_name.to_string(),
            reader: BufReader::new(port),
            line_buf: String::new(),
        })
    }

    /// List available serial ports (helper for CLI)
    pub fn list_available_ports() -> Result<Vec<serialport::SerialPortInfo>, MeterError> {
        serialport::available_ports().map_err(MeterError::SerialPort)
    }
}

impl AdcReader for SerialAdc {
    fn read(&mut self, input: AdcInput) -> Result<RawAdcValue, AdcError> {
        let port = self.reader.get_mut();
        port.write_all(read_command(input).as_bytes())?;
        port.flush()?;

        for _ in 0..MAX_NOISE_LINES {
            self.line_buf.clear();
            match self.reader.read_line(&mut self.line_buf) {
                Ok(0) => continue,
                Ok(_) => {
                    if let Some(value) = expect_reading(parse_line(&self.line_buf), input)? {
                        return check_range(input, value);
                    }
                    tracing::trace!("Ignoring line from {}: {:?}", self.port_name, self.line_buf);
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    return Err(AdcError::Timeout(input));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AdcError::Timeout(input))
    }

    fn name(&self) -> &str {
        &self.port_name
    }
}
