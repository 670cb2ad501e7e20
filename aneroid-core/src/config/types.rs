//! Board configuration types
//!
//! Every value the firmware needs to bring up the bus and the sensor is
//! carried explicitly in a [`BoardConfig`]; nothing is hardwired in
//! static state.

use aneroid_hal::I2cConfig;

use crate::traits::Oversampling;

/// Two-wire bus configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    /// Clock frequency in Hz (must be non-zero)
    pub frequency_hz: u32,
    /// Per-leg timeout in microseconds (must be non-zero)
    pub timeout_us: u32,
    /// Data line GPIO
    pub sda_pin: u8,
    /// Clock line GPIO
    pub scl_pin: u8,
    /// Enable internal pull-ups (otherwise external pull-ups are assumed)
    pub enable_pullups: bool,
}

impl BusConfig {
    /// GY-63 breakout on I2C0, GPIO8/9, 400 kHz
    pub const fn new() -> Self {
        Self {
            frequency_hz: 400_000,
            timeout_us: 20_000,
            sda_pin: 8,
            scl_pin: 9,
            enable_pullups: true,
        }
    }

    /// Controller-level part of the configuration
    pub fn controller_config(&self) -> I2cConfig {
        I2cConfig {
            frequency: self.frequency_hz,
            sda_pin: self.sda_pin,
            scl_pin: self.scl_pin,
            enable_pullups: self.enable_pullups,
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Barometric sensor settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSettings {
    /// 7-bit device address (0x77 with CSB low, 0x76 with CSB high)
    pub address: u8,
    /// Oversampling applied to both conversions
    pub oversampling: Oversampling,
}

impl SensorSettings {
    /// Default address, highest resolution
    pub const fn new() -> Self {
        Self {
            address: 0x77,
            oversampling: Oversampling::Osr4096,
        }
    }
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Telemetry pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetrySettings {
    /// Period between readings in milliseconds
    pub period_ms: u32,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self { period_ms: 200 }
    }
}

/// Complete board configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardConfig {
    pub bus: BusConfig,
    pub sensor: SensorSettings,
    pub telemetry: TelemetrySettings,
}
