//! I2C controller abstractions
//!
//! Models a blocking, timeout-bound two-wire controller the way the RP2040
//! peripheral behaves: each transfer leg either reports the number of bytes
//! moved or a low-level fault, and the reason for an aborted transfer is
//! latched in a separate abort-source register until it is read back.

/// First address outside the 7-bit range
pub const ADDRESS_LIMIT: u8 = 0x80;

/// Check whether an address fits in 7 bits
pub const fn is_valid_address(address: u8) -> bool {
    address < ADDRESS_LIMIT
}

/// Abort-source bits (RP2040 `IC_TX_ABRT_SOURCE` layout)
///
/// Several bits can be latched at once; the transport decides which one
/// wins when classifying a failed transfer.
pub mod abort {
    /// 7-bit address was not acknowledged
    pub const ADDR_7B_NOACK: u32 = 1 << 0;
    /// First byte of a 10-bit address was not acknowledged
    pub const ADDR_10B1_NOACK: u32 = 1 << 1;
    /// Second byte of a 10-bit address was not acknowledged
    pub const ADDR_10B2_NOACK: u32 = 1 << 2;
    /// Data byte was not acknowledged
    pub const TXDATA_NOACK: u32 = 1 << 3;
    /// General call was not acknowledged
    pub const GCALL_NOACK: u32 = 1 << 4;
    /// Read issued after a general call
    pub const GCALL_READ: u32 = 1 << 5;
    /// Start byte was acknowledged
    pub const SBYTE_ACKDET: u32 = 1 << 7;
    /// 10-bit read attempted with restart disabled
    pub const RD_10B_NORSTRT: u32 = 1 << 10;
    /// Controller operation attempted while controller mode disabled
    pub const MASTER_DIS: u32 = 1 << 11;
    /// Arbitration lost to another controller
    pub const ARB_LOST: u32 = 1 << 12;
    /// Transfer aborted by user request
    pub const USER_ABRT: u32 = 1 << 16;

    /// Any not-acknowledged condition (address or data)
    pub const NOACK_MASK: u32 = ADDR_7B_NOACK | ADDR_10B1_NOACK | ADDR_10B2_NOACK | TXDATA_NOACK;
}

/// Low-level fault reported by a transfer leg
///
/// Mirrors the sentinel return values of the RP2040 SDK transfer calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerFault {
    /// Deadline passed before the leg completed
    Timeout,
    /// Transfer aborted; consult the abort-source register for the cause
    Generic,
    /// Any other negative result code
    Other(i32),
}

impl ControllerFault {
    /// SDK result code for a generic failure
    pub const GENERIC_CODE: i32 = -1;
    /// SDK result code for a timeout
    pub const TIMEOUT_CODE: i32 = -2;

    /// Raw result code, as recorded in transfer diagnostics
    pub const fn code(self) -> i32 {
        match self {
            ControllerFault::Timeout => Self::TIMEOUT_CODE,
            ControllerFault::Generic => Self::GENERIC_CODE,
            ControllerFault::Other(code) => code,
        }
    }
}

/// Outcome of a single transfer leg: bytes moved, or a fault
pub type LegResult = Result<usize, ControllerFault>;

/// Errors raised while configuring a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigureError {
    /// Pin cannot be muxed to this controller
    InvalidPin,
    /// Requested clock cannot be generated
    UnsupportedFrequency,
}

/// I2C controller
///
/// Blocking transfer legs with an explicit timeout. A leg sent with
/// `nostop = true` keeps the bus held so the next leg starts with a
/// repeated start instead of a stop/start pair.
pub trait I2cController {
    /// Apply clock and pin configuration
    ///
    /// Called once before any transfer. A failed call must leave the
    /// controller unusable rather than half-configured.
    fn configure(&mut self, config: &I2cConfig) -> Result<(), ConfigureError>;

    /// Write `data` to the device at `address`
    ///
    /// An empty `data` moves nothing and never addresses the device;
    /// callers that need an ACK must send at least one byte.
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `data` - Bytes to write
    /// * `nostop` - Hold the bus after the last byte
    /// * `timeout_us` - Upper bound for the whole leg
    fn write_leg(&mut self, address: u8, data: &[u8], nostop: bool, timeout_us: u32) -> LegResult;

    /// Read into `buf` from the device at `address`
    ///
    /// An empty `buf` behaves like an empty write.
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `buf` - Buffer to read into
    /// * `nostop` - Hold the bus after the last byte
    /// * `timeout_us` - Upper bound for the whole leg
    fn read_leg(&mut self, address: u8, buf: &mut [u8], nostop: bool, timeout_us: u32)
        -> LegResult;

    /// Read and clear the latched abort-source bits
    ///
    /// Returns 0 when no abort is latched.
    fn take_abort_source(&mut self) -> u32;

    /// Release the controller (disable the peripheral)
    fn shutdown(&mut self);
}

/// I2C configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    /// Data line GPIO
    pub sda_pin: u8,
    /// Clock line GPIO
    pub scl_pin: u8,
    /// Enable the internal pull-ups (otherwise external pull-ups are assumed)
    pub enable_pullups: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_range() {
        assert!(is_valid_address(0x00));
        assert!(is_valid_address(0x77));
        assert!(is_valid_address(0x7F));
        assert!(!is_valid_address(0x80));
        assert!(!is_valid_address(0xFF));
    }

    #[test]
    fn test_fault_codes() {
        assert_eq!(ControllerFault::Timeout.code(), -2);
        assert_eq!(ControllerFault::Generic.code(), -1);
        assert_eq!(ControllerFault::Other(-7).code(), -7);
    }

    #[test]
    fn test_noack_mask() {
        assert_ne!(abort::NOACK_MASK & abort::ADDR_7B_NOACK, 0);
        assert_ne!(abort::NOACK_MASK & abort::TXDATA_NOACK, 0);
        assert_eq!(abort::NOACK_MASK & abort::ARB_LOST, 0);
        assert_eq!(abort::NOACK_MASK & abort::GCALL_NOACK, 0);
    }
}
