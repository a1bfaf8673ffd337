use std::collections::{HashMap, VecDeque};
use std::path::Path;

use super::protocol::parse_readings;
use super::{AdcInput, AdcReader, RawAdcValue, check_range};
use crate::error::{AdcError, MeterError};

/// Replays conversions captured from a real front-end.
///
/// Capture lines carry `A<pin>=<value>` / `REF=<value>` tokens, optionally after
/// an ISO-8601 timestamp. Each input replays its own queue in file order.
pub struct PlaybackAdc {
    name: String,
    recorded: HashMap<AdcInput, Vec<RawAdcValue>>,
    pending: HashMap<AdcInput, VecDeque<RawAdcValue>>,
    loop_playback: bool,
}

impl PlaybackAdc {
    pub fn open(capture_file: &Path, loop_playback: bool) -> Result<Self, MeterError> {
        let contents = std::fs::read_to_string(capture_file)?;
        let name = capture_file.to_str().unwrap_or("playback").to_string();
        let adc = Self::from_capture(name, &contents, loop_playback)?;

        tracing::info!(
            "Playback loaded from {:?}: {} inputs, loop={}",
            capture_file,
            adc.recorded.len(),
            loop_playback
        );

        Ok(adc)
    }

    pub fn from_capture(name: String, contents: &str, loop_playback: bool) -> Result<Self, MeterError> {
        let mut recorded: HashMap<AdcInput, Vec<RawAdcValue>> = HashMap::new();

        for line in contents.lines() {
            for (input, value) in parse_readings(line) {
                let value = check_range(input, value)?;
                recorded.entry(input).or_default().push(value);
            }
        }

        if recorded.is_empty() {
            return Err(MeterError::Config(format!("capture {} holds no readings", name)));
        }

        let pending = recorded
            .iter()
            .map(|(input, values)| (*input, values.iter().copied().collect()))
            .collect();

        Ok(Self {
            name,
            recorded,
            pending,
            loop_playback,
        })
    }

    /// Readings still queued for `input` before it wraps or runs out
    #[cfg(test)]
    pub fn remaining(&self, input: AdcInput) -> usize {
        self.pending.get(&input).map_or(0, VecDeque::len)
    }
}

impl AdcReader for PlaybackAdc {
    fn read(&mut self, input: AdcInput) -> Result<RawAdcValue, AdcError> {
        let queue = self
            .pending
            .get_mut(&input)
            .ok_or(AdcError::Exhausted(input))?;

        if queue.is_empty() && self.loop_playback {
            if let Some(values) = self.recorded.get(&input) {
                tracing::debug!("Looping playback of {} from start", input);
                queue.extend(values.iter().copied());
            }
        }

        queue.pop_front().ok_or(AdcError::Exhausted(input))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPTURE: &str = "\
2025-01-15T10:30:00.000 REF=226
2025-01-15T10:30:00.001 A0=510 A2=600
2025-01-15T10:30:00.002 A0=514 A2=420
# comment lines are ignored
";

    #[test]
    fn test_replays_per_input_order() {
        let mut adc = PlaybackAdc::from_capture("test".into(), CAPTURE, false).unwrap();

        assert_eq!(adc.read(AdcInput::InternalReference).unwrap(), 226);
        assert_eq!(adc.read(AdcInput::Pin(2)).unwrap(), 600);
        assert_eq!(adc.read(AdcInput::Pin(0)).unwrap(), 510);
        assert_eq!(adc.read(AdcInput::Pin(0)).unwrap(), 514);
        assert_eq!(adc.read(AdcInput::Pin(2)).unwrap(), 420);
        assert_eq!(adc.remaining(AdcInput::Pin(2)), 0);
    }

    #[test]
    fn test_exhausted_without_loop() {
        let mut adc = PlaybackAdc::from_capture("test".into(), CAPTURE, false).unwrap();

        adc.read(AdcInput::InternalReference).unwrap();
        assert!(matches!(
            adc.read(AdcInput::InternalReference),
            Err(AdcError::Exhausted(AdcInput::InternalReference))
        ));
    }

    #[test]
    fn test_loops_when_enabled() {
        let mut adc = PlaybackAdc::from_capture("test".into(), CAPTURE, true).unwrap();

        assert_eq!(adc.read(AdcInput::InternalReference).unwrap(), 226);
        assert_eq!(adc.read(AdcInput::InternalReference).unwrap(), 226);
    }

    #[test]
    fn test_unknown_input_is_exhausted() {
        let mut adc = PlaybackAdc::from_capture("test".into(), CAPTURE, true).unwrap();
        assert!(matches!(
            adc.read(AdcInput::Pin(5)),
            Err(AdcError::Exhausted(AdcInput::Pin(5)))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_capture() {
        let result = PlaybackAdc::from_capture("bad".into(), "A0=4096", false);
        assert!(matches!(result, Err(MeterError::Adc(AdcError::OutOfRange { .. }))));
    }

    #[test]
    fn test_rejects_empty_capture() {
        let result = PlaybackAdc::from_capture("empty".into(), "nothing here\n", false);
        assert!(matches!(result, Err(MeterError::Config(_))));
    }

    #[test]
    fn test_open_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.log");
        std::fs::write(&path, CAPTURE).unwrap();

        let mut adc = PlaybackAdc::open(&path, false).unwrap();
        assert_eq!(adc.read(AdcInput::Pin(0)).unwrap(), 510);
        assert!(adc.name().ends_with("capture.log"));
    }
}
