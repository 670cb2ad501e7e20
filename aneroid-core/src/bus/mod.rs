//! Two-wire bus transport
//!
//! Wraps a blocking [`I2cController`](aneroid_hal::I2cController) and turns
//! its raw leg results and abort-source bits into a small error taxonomy,
//! keeping a snapshot of the most recent transaction for diagnosis.
//!
//! The transport knows nothing about the devices on the bus.

pub mod diagnostics;
pub mod error;
pub mod transport;

pub use diagnostics::TransactionDiagnostics;
pub use error::{classify, BusError, TransportError};
pub use transport::BusTransport;
