//! Configuration types and parsing
//!
//! The firmware embeds a `board.toml` and parses it at startup with the
//! minimal `no_std` parser in [`toml`].

pub mod toml;
pub mod types;

pub use self::toml::{parse_board_config, ConfigError, ConfigErrorKind};
pub use types::{BoardConfig, BusConfig, SensorSettings, TelemetrySettings};
