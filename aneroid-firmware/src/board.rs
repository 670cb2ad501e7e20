//! Board definition: wiring and the embedded configuration
//!
//! The RP2040 pin mux is fixed at compile time by the embassy typestate,
//! so the I2C pins below are the source of truth; `board.toml` may only
//! confirm them.

use aneroid_core::config::{parse_board_config, BoardConfig};
use defmt::*;

/// Embedded board configuration (compiled into firmware)
/// Edit board.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../board.toml");

/// I2C0 data line
pub const SDA_GPIO: u8 = 8;
/// I2C0 clock line
pub const SCL_GPIO: u8 = 9;

/// Parse the embedded configuration and reconcile it with the wiring
///
/// A parse error falls back to the built-in defaults, which describe
/// this board.
pub fn load_config() -> BoardConfig {
    let mut config = match parse_board_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded board configuration");
            config
        }
        Err(e) => {
            // build.rs validates board.toml, so this only trips on parser drift
            error!("Failed to parse board.toml: {}", e);
            error!("Using built-in defaults");
            BoardConfig::default()
        }
    };

    if config.bus.sda_pin != SDA_GPIO || config.bus.scl_pin != SCL_GPIO {
        warn!(
            "board.toml asks for SDA=GPIO{} SCL=GPIO{}, board is wired to GPIO{}/GPIO{}",
            config.bus.sda_pin, config.bus.scl_pin, SDA_GPIO, SCL_GPIO
        );
        config.bus.sda_pin = SDA_GPIO;
        config.bus.scl_pin = SCL_GPIO;
    }

    config
}
