//! Hardware abstraction traits
//!
//! These traits define the interface between the application glue
//! and sensor-specific driver implementations.

pub mod barometer;

pub use barometer::{Barometer, Measurement, Oversampling};
