//! Aneroid Hardware Abstraction Layer
//!
//! This crate defines the controller-level abstraction that chip-specific
//! HALs implement (RP2040 today). The bus transport in `aneroid-core` is
//! written against these traits only, so it can be exercised on the host
//! with a simulated controller.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  aneroid-drivers (MS5611 sensor)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  aneroid-core (bus transport)           │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  aneroid-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ aneroid-hal-  │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`i2c::I2cController`] - Bounded-timeout two-wire transfer legs

#![no_std]
#![deny(unsafe_code)]

pub mod i2c;

// Re-export key items at crate root for convenience
pub use i2c::{ConfigureError, ControllerFault, I2cConfig, I2cController, LegResult};
