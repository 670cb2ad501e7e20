//! RP2040-specific HAL for the barometric telemetry node
//!
//! This crate provides the RP2040 implementation of the shared
//! `aneroid-hal` traits:
//!
//! - I2C pin-to-peripheral mapping
//! - Blocking, deadline-bound I2C controller with repeated-start and
//!   abort-source latching (implements `aneroid_hal::I2cController`)

#![no_std]

pub mod i2c;
pub mod pins;

pub use i2c::Rp2040I2c;
pub use pins::I2cId;

// Re-export shared traits from aneroid-hal for convenience
pub use aneroid_hal::{I2cConfig, I2cController};
