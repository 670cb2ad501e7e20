//! Telemetry protocol
//!
//! Readings leave the node as one short ASCII line per sample, suitable
//! for a UDP datagram or a serial console:
//!
//! ```text
//! ms=<uptime ms>,t_x100=<0.01 °C>,p_pa=<Pa>\n
//! ```
//!
//! For example `ms=15200,t_x100=2007,p_pa=100009\n`. Frames are bounded
//! to [`MAX_FRAME_SIZE`] bytes so they can be built without a heap.
//!
//! Producing a frame is behind the [`TelemetryEncoder`] trait so the
//! publishing loop does not care about the format.

#![no_std]
#![deny(unsafe_code)]

pub mod telemetry;

pub use telemetry::{
    LineError, TelemetryEncoder, TelemetryFrame, TelemetryLine, TextLineEncoder, MAX_FRAME_SIZE,
};
