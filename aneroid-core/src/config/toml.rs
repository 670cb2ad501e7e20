//! Simple TOML parser for board configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! the board file. It does NOT support full TOML.
//!
//! Supported features:
//! - Key = value pairs (integer, boolean, `"gpioN"` pin string)
//! - [section] headers: `bus`, `sensor`, `telemetry`
//! - Decimal and `0x` hex integers, with `_` separators
//! - Comments (# ...)
//!
//! NOT supported:
//! - Strings other than pin names
//! - Arrays and inline tables
//! - Dotted keys

use core::fmt;

use super::types::BoardConfig;
use crate::traits::Oversampling;

/// Highest GPIO on the RP2040
const MAX_PIN: u8 = 29;

/// Fast-mode Plus, the fastest clock the bus supports
const MAX_FREQUENCY_HZ: u32 = 1_000_000;

/// What went wrong while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigErrorKind {
    /// Unknown or malformed section header
    InvalidSection,
    /// Line is neither a header nor `key = value`
    InvalidLine,
    /// Key not known in the current section
    UnknownKey,
    /// Value has the wrong type or is out of range
    InvalidValue,
}

/// Parse error with the 1-based line it occurred on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigError {
    pub line: usize,
    pub kind: ConfigErrorKind,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            ConfigErrorKind::InvalidSection => "invalid section",
            ConfigErrorKind::InvalidLine => "invalid line",
            ConfigErrorKind::UnknownKey => "unknown key",
            ConfigErrorKind::InvalidValue => "invalid value",
        };
        write!(f, "{} on line {}", what, self.line)
    }
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Bus,
    Sensor,
    Telemetry,
}

/// Parse a board file into a [`BoardConfig`]
///
/// Keys that are absent keep their defaults.
pub fn parse_board_config(input: &str) -> Result<BoardConfig, ConfigError> {
    let mut config = BoardConfig::default();
    let mut section = Section::Root;

    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let at = |kind| ConfigError {
            line: line_no,
            kind,
        };
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            let header = strip_comment(line);
            if !header.ends_with(']') {
                return Err(at(ConfigErrorKind::InvalidSection));
            }
            section = parse_section_header(&header[1..header.len() - 1])
                .ok_or(at(ConfigErrorKind::InvalidSection))?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(at(ConfigErrorKind::InvalidLine))?;
        apply_value(&mut config, section, key, value).map_err(at)?;
    }

    Ok(config)
}

fn parse_section_header(header: &str) -> Option<Section> {
    match header.trim() {
        "bus" => Some(Section::Bus),
        "sensor" => Some(Section::Sensor),
        "telemetry" => Some(Section::Telemetry),
        _ => None,
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(hash_pos) => line[..hash_pos].trim(),
        None => line,
    }
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = strip_comment(line[eq_pos + 1..].trim());

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

fn parse_int(value: &str) -> Result<u32, ConfigErrorKind> {
    let mut digits = [0u8; 16];
    let mut len = 0;
    for byte in value.bytes().filter(|&b| b != b'_') {
        if len == digits.len() {
            return Err(ConfigErrorKind::InvalidValue);
        }
        digits[len] = byte;
        len += 1;
    }
    let cleaned = core::str::from_utf8(&digits[..len]).map_err(|_| ConfigErrorKind::InvalidValue)?;

    let parsed = match cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => cleaned.parse(),
    };
    parsed.map_err(|_| ConfigErrorKind::InvalidValue)
}

fn parse_u8(value: &str) -> Result<u8, ConfigErrorKind> {
    u8::try_from(parse_int(value)?).map_err(|_| ConfigErrorKind::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ConfigErrorKind> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigErrorKind::InvalidValue),
    }
}

/// Parse a pin given as an integer (`8`) or a quoted name (`"gpio8"`)
fn parse_pin(value: &str) -> Result<u8, ConfigErrorKind> {
    let pin = match value.strip_prefix('"') {
        Some(quoted) => quoted
            .strip_suffix('"')
            .and_then(|name| name.strip_prefix("gpio"))
            .and_then(|number| number.parse().ok())
            .ok_or(ConfigErrorKind::InvalidValue)?,
        None => parse_u8(value)?,
    };

    if pin > MAX_PIN {
        return Err(ConfigErrorKind::InvalidValue);
    }
    Ok(pin)
}

fn parse_frequency(value: &str) -> Result<u32, ConfigErrorKind> {
    let frequency = non_zero(parse_int(value)?)?;
    if frequency > MAX_FREQUENCY_HZ {
        return Err(ConfigErrorKind::InvalidValue);
    }
    Ok(frequency)
}

fn parse_oversampling(value: &str) -> Result<Oversampling, ConfigErrorKind> {
    let ratio = u16::try_from(parse_int(value)?).map_err(|_| ConfigErrorKind::InvalidValue)?;

    // Reject typos here rather than silently falling back to 4096
    Oversampling::ALL
        .into_iter()
        .find(|osr| osr.ratio() == ratio)
        .ok_or(ConfigErrorKind::InvalidValue)
}

fn non_zero(value: u32) -> Result<u32, ConfigErrorKind> {
    if value == 0 {
        Err(ConfigErrorKind::InvalidValue)
    } else {
        Ok(value)
    }
}

fn apply_value(
    config: &mut BoardConfig,
    section: Section,
    key: &str,
    value: &str,
) -> Result<(), ConfigErrorKind> {
    match (section, key) {
        (Section::Bus, "frequency_hz") => config.bus.frequency_hz = parse_frequency(value)?,
        (Section::Bus, "timeout_us") => config.bus.timeout_us = non_zero(parse_int(value)?)?,
        (Section::Bus, "sda_pin") => config.bus.sda_pin = parse_pin(value)?,
        (Section::Bus, "scl_pin") => config.bus.scl_pin = parse_pin(value)?,
        (Section::Bus, "enable_pullups") => config.bus.enable_pullups = parse_bool(value)?,

        (Section::Sensor, "address") => {
            let address = parse_u8(value)?;
            if !aneroid_hal::i2c::is_valid_address(address) {
                return Err(ConfigErrorKind::InvalidValue);
            }
            config.sensor.address = address;
        }
        (Section::Sensor, "oversampling") => config.sensor.oversampling = parse_oversampling(value)?,

        (Section::Telemetry, "period_ms") => config.telemetry.period_ms = non_zero(parse_int(value)?)?,

        _ => return Err(ConfigErrorKind::UnknownKey),
    }
    Ok(())
}
