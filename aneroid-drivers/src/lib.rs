//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in aneroid-core:
//!
//! - Barometric sensors (MS5611 over I2C)

#![no_std]
#![deny(unsafe_code)]

pub mod sensor;
