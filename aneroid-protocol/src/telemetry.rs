//! Text-line telemetry frames
//!
//! Line format: `ms=<u64>,t_x100=<i32>,p_pa=<u32>\n`
//! - Fields are always present, in this order
//! - Values are plain decimal, no padding
//! - The trailing newline is part of the frame

use core::fmt::{self, Write};

use aneroid_core::traits::Measurement;
use heapless::String;

/// Maximum frame size in bytes
pub const MAX_FRAME_SIZE: usize = 128;

/// Encoded frame, ready to hand to a transport
pub type TelemetryFrame = String<MAX_FRAME_SIZE>;

/// Builds a bounded-size message from the current reading
pub trait TelemetryEncoder {
    /// Encode `reading` taken at `now_ms`
    ///
    /// Returns `None` to skip this period.
    fn encode(&mut self, now_ms: u64, reading: &Measurement) -> Option<TelemetryFrame>;
}

/// Errors when decoding a telemetry line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Line is empty
    Empty,
    /// Not exactly three comma-separated fields
    FieldCount,
    /// Field is not `key=value` or has the wrong key
    UnexpectedKey,
    /// Value is not a decimal number of the right width
    InvalidNumber,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            LineError::Empty => "empty line",
            LineError::FieldCount => "wrong field count",
            LineError::UnexpectedKey => "unexpected key",
            LineError::InvalidNumber => "invalid number",
        };
        f.write_str(what)
    }
}

/// One telemetry sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryLine {
    /// Uptime in milliseconds when the sample was taken
    pub ms: u64,
    /// Temperature in 0.01 °C
    pub t_x100: i32,
    /// Pressure in Pa
    pub p_pa: u32,
}

impl TelemetryLine {
    /// Field keys in wire order
    const KEYS: [&'static str; 3] = ["ms", "t_x100", "p_pa"];

    /// Build a sample from a reading
    pub fn new(now_ms: u64, reading: &Measurement) -> Self {
        Self {
            ms: now_ms,
            t_x100: reading.temperature_centi_c,
            p_pa: reading.pressure_pa,
        }
    }

    /// The reading carried by this sample
    pub fn measurement(&self) -> Measurement {
        Measurement {
            temperature_centi_c: self.t_x100,
            pressure_pa: self.p_pa,
        }
    }

    /// Encode into a frame; `None` if it does not fit
    pub fn to_frame(&self) -> Option<TelemetryFrame> {
        let mut frame = TelemetryFrame::new();
        write!(frame, "{}", self).ok()?;
        Some(frame)
    }

    /// Decode a line; the trailing newline is optional
    pub fn parse(line: &str) -> Result<Self, LineError> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            return Err(LineError::Empty);
        }

        let mut values = [""; 3];
        let mut fields = line.split(',');
        for (slot, key) in values.iter_mut().zip(Self::KEYS) {
            let field = fields.next().ok_or(LineError::FieldCount)?;
            let (k, v) = field.split_once('=').ok_or(LineError::UnexpectedKey)?;
            if k != key {
                return Err(LineError::UnexpectedKey);
            }
            *slot = v;
        }
        if fields.next().is_some() {
            return Err(LineError::FieldCount);
        }

        Ok(Self {
            ms: parse_number(values[0])?,
            t_x100: parse_number(values[1])?,
            p_pa: parse_number(values[2])?,
        })
    }
}

impl fmt::Display for TelemetryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ms={},t_x100={},p_pa={}", self.ms, self.t_x100, self.p_pa)
    }
}

fn parse_number<T: core::str::FromStr>(value: &str) -> Result<T, LineError> {
    // FromStr accepts a leading '+', the wire format never has one
    if value.starts_with('+') {
        return Err(LineError::InvalidNumber);
    }
    value.parse().map_err(|_| LineError::InvalidNumber)
}

/// Encoder for the text-line format
#[derive(Debug, Default, Clone, Copy)]
pub struct TextLineEncoder;

impl TextLineEncoder {
    pub const fn new() -> Self {
        Self
    }
}

impl TelemetryEncoder for TextLineEncoder {
    fn encode(&mut self, now_ms: u64, reading: &Measurement) -> Option<TelemetryFrame> {
        TelemetryLine::new(now_ms, reading).to_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(t: i32, p: u32) -> Measurement {
        Measurement {
            temperature_centi_c: t,
            pressure_pa: p,
        }
    }

    #[test]
    fn test_encode_line() {
        let mut encoder = TextLineEncoder::new();
        let frame = encoder.encode(15_200, &reading(2007, 100_009)).unwrap();

        assert_eq!(frame.as_str(), "ms=15200,t_x100=2007,p_pa=100009\n");
    }

    #[test]
    fn test_encode_negative_temperature() {
        let frame = TelemetryLine::new(0, &reading(-1875, 0)).to_frame().unwrap();
        assert_eq!(frame.as_str(), "ms=0,t_x100=-1875,p_pa=0\n");
    }

    #[test]
    fn test_worst_case_fits() {
        let line = TelemetryLine {
            ms: u64::MAX,
            t_x100: i32::MIN,
            p_pa: u32::MAX,
        };
        let frame = line.to_frame().unwrap();
        assert!(frame.len() < MAX_FRAME_SIZE);
    }

    #[test]
    fn test_parse_line() {
        let line = TelemetryLine::parse("ms=15200,t_x100=2007,p_pa=100009\n").unwrap();
        assert_eq!(line.ms, 15_200);
        assert_eq!(line.measurement(), reading(2007, 100_009));

        // Newline optional, CRLF tolerated
        assert!(TelemetryLine::parse("ms=1,t_x100=-5,p_pa=2").is_ok());
        assert!(TelemetryLine::parse("ms=1,t_x100=-5,p_pa=2\r\n").is_ok());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(TelemetryLine::parse("\n"), Err(LineError::Empty));
        assert_eq!(TelemetryLine::parse("ms=1,t_x100=2"), Err(LineError::FieldCount));
        assert_eq!(
            TelemetryLine::parse("ms=1,t_x100=2,p_pa=3,x=4"),
            Err(LineError::FieldCount)
        );
        assert_eq!(
            TelemetryLine::parse("t_x100=2,ms=1,p_pa=3"),
            Err(LineError::UnexpectedKey)
        );
        assert_eq!(TelemetryLine::parse("ms1,t_x100=2,p_pa=3"), Err(LineError::UnexpectedKey));
        assert_eq!(
            TelemetryLine::parse("ms=1,t_x100=2,p_pa=-3"),
            Err(LineError::InvalidNumber)
        );
        assert_eq!(
            TelemetryLine::parse("ms=+1,t_x100=2,p_pa=3"),
            Err(LineError::InvalidNumber)
        );
        assert_eq!(
            TelemetryLine::parse("ms=1,t_x100=,p_pa=3"),
            Err(LineError::InvalidNumber)
        );
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn every_sample_fits_and_decodes(ms: u64, t: i32, p: u32) {
                let line = TelemetryLine { ms, t_x100: t, p_pa: p };
                let frame = line.to_frame();
                prop_assert!(frame.is_some());

                let frame = frame.unwrap();
                prop_assert!(frame.ends_with('\n'));
                prop_assert_eq!(TelemetryLine::parse(&frame), Ok(line));
            }
        }
    }
}
