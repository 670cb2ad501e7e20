//! Board-agnostic core logic for the barometric telemetry node
//!
//! This crate contains all logic that does not depend on a specific chip:
//!
//! - Bus transport: classified, diagnosable two-wire transactions
//! - Sensor traits (barometer, oversampling)
//! - Configuration types and the embedded board-config parser

#![no_std]
#![deny(unsafe_code)]

pub mod bus;
pub mod config;
pub mod traits;
