use std::sync::LazyLock;

use regex::Regex;

use super::AdcInput;
use crate::error::ProtocolError;

// Pre-compiled regex patterns for efficiency
static READING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:A(\d{1,3})|(REF))\s*=\s*(\d+)\b").unwrap());

/// Parsed line variants from the ADC front-end serial output
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// A single conversion result: A<pin>=<value> or REF=<value>
    Reading { input: AdcInput, value: u32 },
    /// ADC ready banner
    AdcReady,
    /// Error message from device
    Error(String),
    /// Unrecognized line
    Unknown(String),
}

/// Format the request for one conversion on `input`
pub fn read_command(input: AdcInput) -> String {
    format!("READ {}\n", input)
}

/// Extract every `A<pin>=<value>` / `REF=<value>` token from a line
pub fn parse_readings(line: &str) -> Vec<(AdcInput, u32)> {
    READING_REGEX
        .captures_iter(line)
        .filter_map(|caps| {
            let input = match (caps.get(1), caps.get(2)) {
                (Some(pin), _) => AdcInput::Pin(pin.as_str().parse().ok()?),
                (None, Some(_)) => AdcInput::InternalReference,
                (None, None) => return None,
            };
            let value = caps[3].parse().ok()?;
            Some((input, value))
        })
        .collect()
}

/// Parse a single line from the ADC front-end
pub fn parse_line(input: &str) -> ParsedLine {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return ParsedLine::Unknown(String::new());
    }

    if trimmed == "ADC ready" {
        return ParsedLine::AdcReady;
    }

    // ERROR <message>
    if let Some(msg) = trimmed.strip_prefix("ERROR ") {
        return ParsedLine::Error(msg.to_string());
    }

    let mut readings = parse_readings(trimmed);
    if readings.len() == 1 {
        let (input, value) = readings.remove(0);
        return ParsedLine::Reading { input, value };
    }

    ParsedLine::Unknown(trimmed.to_string())
}

/// Interpret a response line as the reading requested for `expected`.
///
/// Returns `Ok(None)` for lines that carry no reading (banners, noise).
pub fn expect_reading(line: ParsedLine, expected: AdcInput) -> Result<Option<u32>, ProtocolError> {
    match line {
        ParsedLine::Reading { input, value } if input == expected => Ok(Some(value)),
        ParsedLine::Reading { input, .. } => Err(ProtocolError::UnexpectedInput {
            expected,
            got: input,
        }),
        ParsedLine::Error(msg) => Err(ProtocolError::Device(msg)),
        ParsedLine::AdcReady | ParsedLine::Unknown(_) => Ok(None),
    }
}
