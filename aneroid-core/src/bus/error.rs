//! Bus error taxonomy and result classification

use core::fmt;

use aneroid_hal::i2c::abort;
use aneroid_hal::{ConfigureError, ControllerFault, LegResult};

/// Failure of a transfer that reached the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Transfer did not complete before the deadline
    Timeout,
    /// Address or data byte not acknowledged
    Nack,
    /// Another controller won arbitration
    ArbitrationLost,
    /// Controller aborted for another reason (illegal start/stop, etc.)
    Bus,
    /// Unclassified failure, including short transfers
    Io,
}

impl TransportError {
    /// Stable name for logs
    pub const fn as_str(self) -> &'static str {
        match self {
            TransportError::Timeout => "timeout",
            TransportError::Nack => "no acknowledge",
            TransportError::ArbitrationLost => "arbitration lost",
            TransportError::Bus => "bus error",
            TransportError::Io => "i/o error",
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the bus transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Bad argument (address out of range, zero clock/timeout); no bus traffic
    InvalidArgument,
    /// Handle not initialized (or already torn down); no bus traffic
    NotReady,
    /// Controller refused the configuration
    Configure(ConfigureError),
    /// Transfer failed on the wire
    Transport(TransportError),
}

impl BusError {
    /// Stable name for logs
    pub const fn as_str(self) -> &'static str {
        match self {
            BusError::InvalidArgument => "invalid argument",
            BusError::NotReady => "bus not initialized",
            BusError::Configure(ConfigureError::InvalidPin) => "invalid pin",
            BusError::Configure(ConfigureError::UnsupportedFrequency) => "unsupported frequency",
            BusError::Transport(e) => e.as_str(),
        }
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TransportError> for BusError {
    fn from(e: TransportError) -> Self {
        BusError::Transport(e)
    }
}

impl From<ConfigureError> for BusError {
    fn from(e: ConfigureError) -> Self {
        BusError::Configure(e)
    }
}

/// Classify the outcome of a transfer leg
///
/// Precedence: short transfer, timeout, not-acknowledged, arbitration
/// lost, other abort, unclassified. Abort bits can coexist, so the order
/// of the checks is significant.
///
/// # Arguments
/// * `result` - Raw leg result from the controller
/// * `requested` - Number of bytes the leg was asked to move
/// * `abort_source` - Abort bits accumulated over the transaction
pub fn classify(result: LegResult, requested: usize, abort_source: u32) -> Result<(), TransportError> {
    match result {
        Ok(done) if done == requested => Ok(()),
        // The controller did not flag it, but the bus stopped early
        Ok(_) => Err(TransportError::Io),
        Err(ControllerFault::Timeout) => Err(TransportError::Timeout),
        Err(ControllerFault::Generic) => Err(classify_abort(abort_source)),
        Err(ControllerFault::Other(_)) => Err(TransportError::Io),
    }
}

fn classify_abort(abort_source: u32) -> TransportError {
    if abort_source & abort::NOACK_MASK != 0 {
        TransportError::Nack
    } else if abort_source & abort::ARB_LOST != 0 {
        TransportError::ArbitrationLost
    } else {
        TransportError::Bus
    }
}
