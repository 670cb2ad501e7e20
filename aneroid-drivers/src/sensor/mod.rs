//! Sensor drivers

pub mod ms5611;

pub use aneroid_core::traits::Measurement;
pub use ms5611::{compensate, Coefficients, Ms5611, Ms5611Config, Ms5611Error, Prom};
