//! Bus transport over a single I2C controller

use aneroid_hal::i2c::is_valid_address;
use aneroid_hal::{I2cController, LegResult};

use super::diagnostics::TransactionDiagnostics;
use super::error::{classify, BusError, TransportError};
use crate::config::BusConfig;

/// Handle to one two-wire bus
///
/// Owns the controller, the per-leg timeout and the diagnostics of the
/// last transaction. Every operation blocks until it completes or times
/// out; the handle is meant for a single owner and performs no locking.
pub struct BusTransport<C> {
    controller: C,
    timeout_us: u32,
    ready: bool,
    diag: TransactionDiagnostics,
}

impl<C: I2cController> BusTransport<C> {
    /// Wrap a controller; the handle is not ready until [`init`](Self::init) succeeds
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            timeout_us: 0,
            ready: false,
            diag: TransactionDiagnostics::default(),
        }
    }

    /// Configure the controller and mark the handle ready
    ///
    /// Clock and timeout must be non-zero. The handle only reports ready
    /// once the controller accepted the whole configuration.
    pub fn init(&mut self, config: &BusConfig) -> Result<(), BusError> {
        if config.frequency_hz == 0 || config.timeout_us == 0 {
            return Err(BusError::InvalidArgument);
        }

        self.ready = false;
        self.diag = TransactionDiagnostics::default();

        self.controller.configure(&config.controller_config())?;

        self.timeout_us = config.timeout_us;
        self.ready = true;
        Ok(())
    }

    /// Shut the controller down and drop back to the not-ready state
    pub fn deinit(&mut self) {
        self.controller.shutdown();
        self.timeout_us = 0;
        self.ready = false;
        self.diag = TransactionDiagnostics::default();
    }

    /// Give the controller back
    pub fn release(self) -> C {
        self.controller
    }

    /// Check if the handle is ready for transfers
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Per-leg timeout in microseconds (0 when not ready)
    pub fn timeout_us(&self) -> u32 {
        self.timeout_us
    }

    /// Diagnostics of the most recent transaction
    pub fn last_diagnostics(&self) -> &TransactionDiagnostics {
        &self.diag
    }

    /// Write `data` to `address`
    ///
    /// With `hold_bus` set, no stop condition is sent so a following
    /// transfer starts with a repeated start. `data` must not be empty.
    pub fn write(&mut self, address: u8, data: &[u8], hold_bus: bool) -> Result<(), BusError> {
        self.validate(address)?;
        non_empty(data.len())?;
        self.diag = TransactionDiagnostics::begin(address, data.len(), 0, hold_bus);

        let (done, status) = self.write_leg(address, data, hold_bus);
        self.diag.write_completed = done;
        status.map_err(BusError::from)
    }

    /// Read `buf.len()` bytes from `address`; `buf` must not be empty
    pub fn read(&mut self, address: u8, buf: &mut [u8], hold_bus: bool) -> Result<(), BusError> {
        self.validate(address)?;
        non_empty(buf.len())?;
        self.diag = TransactionDiagnostics::begin(address, 0, buf.len(), hold_bus);

        let (done, status) = self.read_leg(address, buf, hold_bus);
        self.diag.read_completed = done;
        status.map_err(BusError::from)
    }

    /// Write a register selector, then read the value, as one transaction
    ///
    /// A non-empty write leg is sent with the bus held so the read follows
    /// with a repeated start. If the write leg fails the read is skipped.
    /// An empty write degrades to a plain read with a stop condition.
    /// `read` must not be empty.
    pub fn write_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), BusError> {
        self.validate(address)?;
        non_empty(read.len())?;

        let hold = !write.is_empty();
        self.diag = TransactionDiagnostics::begin(address, write.len(), read.len(), hold);

        if hold {
            let (done, status) = self.write_leg(address, write, true);
            self.diag.write_completed = done;
            if let Err(e) = status {
                self.diag.read_completed = 0;
                return Err(e.into());
            }
        }

        let (done, status) = self.read_leg(address, read, false);
        self.diag.read_completed = done;
        status.map_err(BusError::from)
    }

    /// Check whether a device acknowledges `address` (1-byte read)
    pub fn probe(&mut self, address: u8) -> Result<(), BusError> {
        self.validate(address)?;

        let mut dummy = [0u8; 1];
        self.read(address, &mut dummy, false)
    }

    fn validate(&self, address: u8) -> Result<(), BusError> {
        if !self.ready {
            return Err(BusError::NotReady);
        }
        if !is_valid_address(address) {
            return Err(BusError::InvalidArgument);
        }
        Ok(())
    }

    fn write_leg(&mut self, address: u8, data: &[u8], nostop: bool) -> (usize, Result<(), TransportError>) {
        let result = self
            .controller
            .write_leg(address, data, nostop, self.timeout_us);
        self.finish_leg(result, data.len())
    }

    fn read_leg(&mut self, address: u8, buf: &mut [u8], nostop: bool) -> (usize, Result<(), TransportError>) {
        let requested = buf.len();
        let result = self.controller.read_leg(address, buf, nostop, self.timeout_us);
        self.finish_leg(result, requested)
    }

    /// Record the raw result, latch abort bits, then classify
    fn finish_leg(&mut self, result: LegResult, requested: usize) -> (usize, Result<(), TransportError>) {
        self.diag.controller_result = match result {
            Ok(done) => i32::try_from(done).unwrap_or(i32::MAX),
            Err(fault) => fault.code(),
        };
        self.diag.abort_source |= self.controller.take_abort_source();

        let done = result.unwrap_or(0);
        (done, classify(result, requested, self.diag.abort_source))
    }
}

/// A zero-length leg never puts the address on the wire
fn non_empty(len: usize) -> Result<(), BusError> {
    if len == 0 {
        return Err(BusError::InvalidArgument);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aneroid_hal::i2c::abort;
    use aneroid_hal::{ConfigureError, ControllerFault, I2cConfig};

    const ADDR: u8 = 0x77;

    /// One recorded transfer leg
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Leg {
        Write { address: u8, len: usize, nostop: bool },
        Read { address: u8, len: usize, nostop: bool },
    }

    /// Scripted controller: each leg consumes the next scripted outcome
    struct ScriptedController {
        legs: [Option<Leg>; 8],
        leg_count: usize,
        script: [(LegResult, u32); 4],
        script_len: usize,
        next: usize,
        latched_abort: u32,
        configure_result: Result<(), ConfigureError>,
        configured: Option<I2cConfig>,
        shut_down: bool,
        fill: u8,
    }

    impl ScriptedController {
        fn new() -> Self {
            Self {
                legs: [None; 8],
                leg_count: 0,
                script: [(Ok(0), 0); 4],
                script_len: 0,
                next: 0,
                latched_abort: 0,
                configure_result: Ok(()),
                configured: None,
                shut_down: false,
                fill: 0x5A,
            }
        }

        /// Queue an outcome; `Ok(usize::MAX)` means "complete the whole leg"
        fn then(mut self, result: LegResult, abort_bits: u32) -> Self {
            self.script[self.script_len] = (result, abort_bits);
            self.script_len += 1;
            self
        }

        fn outcome(&mut self, requested: usize) -> LegResult {
            let (result, bits) = if self.next < self.script_len {
                self.script[self.next]
            } else {
                (Ok(usize::MAX), 0)
            };
            self.next += 1;
            self.latched_abort |= bits;
            match result {
                Ok(usize::MAX) => Ok(requested),
                other => other,
            }
        }

        fn record(&mut self, leg: Leg) {
            self.legs[self.leg_count] = Some(leg);
            self.leg_count += 1;
        }
    }

    impl I2cController for ScriptedController {
        fn configure(&mut self, config: &I2cConfig) -> Result<(), ConfigureError> {
            self.configured = Some(*config);
            self.configure_result
        }

        fn write_leg(&mut self, address: u8, data: &[u8], nostop: bool, _timeout_us: u32) -> LegResult {
            self.record(Leg::Write {
                address,
                len: data.len(),
                nostop,
            });
            self.outcome(data.len())
        }

        fn read_leg(&mut self, address: u8, buf: &mut [u8], nostop: bool, _timeout_us: u32) -> LegResult {
            self.record(Leg::Read {
                address,
                len: buf.len(),
                nostop,
            });
            let result = self.outcome(buf.len());
            if let Ok(done) = result {
                for byte in buf.iter_mut().take(done) {
                    *byte = self.fill;
                }
            }
            result
        }

        fn take_abort_source(&mut self) -> u32 {
            core::mem::take(&mut self.latched_abort)
        }

        fn shutdown(&mut self) {
            self.shut_down = true;
        }
    }

    fn ready_bus(controller: ScriptedController) -> BusTransport<ScriptedController> {
        let mut bus = BusTransport::new(controller);
        bus.init(&BusConfig::default()).unwrap();
        bus
    }

    #[test]
    fn test_init_validates_config() {
        let mut bus = BusTransport::new(ScriptedController::new());

        let zero_clock = BusConfig {
            frequency_hz: 0,
            ..BusConfig::default()
        };
        assert_eq!(bus.init(&zero_clock), Err(BusError::InvalidArgument));
        assert!(!bus.is_ready());

        let zero_timeout = BusConfig {
            timeout_us: 0,
            ..BusConfig::default()
        };
        assert_eq!(bus.init(&zero_timeout), Err(BusError::InvalidArgument));
        assert!(!bus.is_ready());
        assert!(bus.release().configured.is_none());
    }

    #[test]
    fn test_init_configures_controller() {
        let config = BusConfig {
            enable_pullups: false,
            ..BusConfig::default()
        };
        let mut bus = BusTransport::new(ScriptedController::new());
        bus.init(&config).unwrap();

        assert!(bus.is_ready());
        assert_eq!(bus.timeout_us(), 20_000);
        let configured = bus.release().configured.unwrap();
        assert_eq!(configured.frequency, 400_000);
        assert!(!configured.enable_pullups);
    }

    #[test]
    fn test_failed_configure_leaves_handle_not_ready() {
        let mut controller = ScriptedController::new();
        controller.configure_result = Err(ConfigureError::InvalidPin);
        let mut bus = BusTransport::new(controller);

        assert_eq!(
            bus.init(&BusConfig::default()),
            Err(BusError::Configure(ConfigureError::InvalidPin))
        );
        assert!(!bus.is_ready());
        assert_eq!(bus.timeout_us(), 0);
        assert_eq!(bus.write(ADDR, &[0x1E], false), Err(BusError::NotReady));
    }

    #[test]
    fn test_uninitialized_handle_rejects_everything() {
        let mut bus = BusTransport::new(ScriptedController::new());
        let mut buf = [0u8; 2];

        assert_eq!(bus.write(ADDR, &[0x1E], false), Err(BusError::NotReady));
        assert_eq!(bus.read(ADDR, &mut buf, false), Err(BusError::NotReady));
        assert_eq!(bus.write_read(ADDR, &[0xA0], &mut buf), Err(BusError::NotReady));
        assert_eq!(bus.probe(ADDR), Err(BusError::NotReady));
        assert_eq!(bus.release().leg_count, 0);
    }

    #[test]
    fn test_deinit_returns_to_not_ready() {
        let mut bus = ready_bus(ScriptedController::new());
        bus.write(ADDR, &[0x1E], false).unwrap();

        bus.deinit();
        assert!(!bus.is_ready());
        assert_eq!(bus.timeout_us(), 0);
        assert_eq!(*bus.last_diagnostics(), TransactionDiagnostics::default());
        assert_eq!(bus.probe(ADDR), Err(BusError::NotReady));
        assert!(bus.release().shut_down);
    }

    #[test]
    fn test_write_records_diagnostics() {
        let mut bus = ready_bus(ScriptedController::new());
        bus.write(ADDR, &[0x48], false).unwrap();

        let diag = bus.last_diagnostics();
        assert_eq!(diag.address, ADDR);
        assert_eq!(diag.write_requested, 1);
        assert_eq!(diag.write_completed, 1);
        assert_eq!(diag.read_requested, 0);
        assert_eq!(diag.controller_result, 1);
        assert!(!diag.nostop);
        assert!(!diag.aborted());
    }

    #[test]
    fn test_short_write_is_io_error() {
        let controller = ScriptedController::new().then(Ok(1), 0);
        let mut bus = ready_bus(controller);

        assert_eq!(
            bus.write(ADDR, &[0xA0, 0x00], false),
            Err(BusError::Transport(TransportError::Io))
        );
        assert_eq!(bus.last_diagnostics().write_completed, 1);
        assert_eq!(bus.last_diagnostics().controller_result, 1);
    }

    #[test]
    fn test_short_read_is_io_error() {
        let controller = ScriptedController::new().then(Ok(2), 0);
        let mut bus = ready_bus(controller);
        let mut buf = [0u8; 3];

        assert_eq!(
            bus.read(ADDR, &mut buf, false),
            Err(BusError::Transport(TransportError::Io))
        );
        assert_eq!(bus.last_diagnostics().read_completed, 2);
    }

    #[test]
    fn test_write_timeout() {
        let controller = ScriptedController::new().then(Err(ControllerFault::Timeout), 0);
        let mut bus = ready_bus(controller);

        assert_eq!(
            bus.write(ADDR, &[0x1E], false),
            Err(BusError::Transport(TransportError::Timeout))
        );
        let diag = bus.last_diagnostics();
        assert_eq!(diag.controller_result, ControllerFault::TIMEOUT_CODE);
        assert_eq!(diag.write_completed, 0);
    }

    #[test]
    fn test_address_nack_on_read() {
        let controller =
            ScriptedController::new().then(Err(ControllerFault::Generic), abort::ADDR_7B_NOACK);
        let mut bus = ready_bus(controller);
        let mut buf = [0u8; 2];

        assert_eq!(
            bus.read(ADDR, &mut buf, false),
            Err(BusError::Transport(TransportError::Nack))
        );
        let diag = bus.last_diagnostics();
        assert_eq!(diag.abort_source, abort::ADDR_7B_NOACK);
        assert_eq!(diag.controller_result, ControllerFault::GENERIC_CODE);
    }

    #[test]
    fn test_write_read_uses_repeated_start() {
        let mut bus = ready_bus(ScriptedController::new());
        let mut buf = [0u8; 2];

        bus.write_read(ADDR, &[0xA2], &mut buf).unwrap();
        assert_eq!(buf, [0x5A, 0x5A]);

        let diag = *bus.last_diagnostics();
        assert_eq!(diag.write_requested, 1);
        assert_eq!(diag.write_completed, 1);
        assert_eq!(diag.read_requested, 2);
        assert_eq!(diag.read_completed, 2);
        assert!(diag.nostop);

        let controller = bus.release();
        assert_eq!(controller.leg_count, 2);
        assert_eq!(
            controller.legs[0],
            Some(Leg::Write {
                address: ADDR,
                len: 1,
                nostop: true
            })
        );
        assert_eq!(
            controller.legs[1],
            Some(Leg::Read {
                address: ADDR,
                len: 2,
                nostop: false
            })
        );
    }

    #[test]
    fn test_write_read_empty_write_is_plain_read() {
        let mut bus = ready_bus(ScriptedController::new());
        let mut buf = [0u8; 3];

        bus.write_read(ADDR, &[], &mut buf).unwrap();

        let diag = *bus.last_diagnostics();
        assert_eq!(diag.write_requested, 0);
        assert_eq!(diag.write_completed, 0);
        assert_eq!(diag.read_completed, 3);
        assert!(!diag.nostop);

        let controller = bus.release();
        assert_eq!(controller.leg_count, 1);
        assert_eq!(
            controller.legs[0],
            Some(Leg::Read {
                address: ADDR,
                len: 3,
                nostop: false
            })
        );
    }

    #[test]
    fn test_write_read_skips_read_after_failed_write() {
        let controller = ScriptedController::new()
            .then(Ok(usize::MAX), 0)
            .then(Err(ControllerFault::Generic), abort::TXDATA_NOACK);
        let mut bus = ready_bus(controller);

        // A successful read leaves non-zero counts behind
        let mut previous = [0u8; 3];
        bus.read(ADDR, &mut previous, false).unwrap();
        assert_eq!(bus.last_diagnostics().read_completed, 3);

        let mut buf = [0u8; 3];
        assert_eq!(
            bus.write_read(ADDR, &[0x00], &mut buf),
            Err(BusError::Transport(TransportError::Nack))
        );
        let diag = *bus.last_diagnostics();
        assert_eq!(diag.write_completed, 0);
        assert_eq!(diag.read_completed, 0);
        assert_eq!(diag.read_requested, 3);
        assert_eq!(buf, [0; 3]);

        // Only the first read and the failed write reached the controller
        assert_eq!(bus.release().leg_count, 2);
    }

    #[test]
    fn test_write_read_accumulates_abort_bits() {
        // Write leg completes but latches a bit; read leg aborts with another
        let controller = ScriptedController::new()
            .then(Ok(usize::MAX), abort::ARB_LOST)
            .then(Err(ControllerFault::Generic), abort::USER_ABRT);
        let mut bus = ready_bus(controller);
        let mut buf = [0u8; 3];

        assert_eq!(
            bus.write_read(ADDR, &[0x00], &mut buf),
            Err(BusError::Transport(TransportError::ArbitrationLost))
        );
        let diag = bus.last_diagnostics();
        assert_eq!(diag.abort_source, abort::ARB_LOST | abort::USER_ABRT);
        assert_eq!(diag.write_completed, 1);
        assert_eq!(diag.read_completed, 0);
    }

    #[test]
    fn test_diagnostics_overwritten_per_transaction() {
        let controller =
            ScriptedController::new().then(Err(ControllerFault::Generic), abort::ADDR_7B_NOACK);
        let mut bus = ready_bus(controller);

        assert!(bus.probe(0x42).is_err());
        assert!(bus.last_diagnostics().aborted());

        bus.write(ADDR, &[0x1E], false).unwrap();
        let diag = bus.last_diagnostics();
        assert_eq!(diag.address, ADDR);
        assert_eq!(diag.abort_source, 0);
        assert_eq!(diag.read_requested, 0);
    }

    #[test]
    fn test_probe_reads_one_byte() {
        let mut bus = ready_bus(ScriptedController::new());
        bus.probe(ADDR).unwrap();

        let controller = bus.release();
        assert_eq!(controller.leg_count, 1);
        assert_eq!(
            controller.legs[0],
            Some(Leg::Read {
                address: ADDR,
                len: 1,
                nostop: false
            })
        );
    }

    #[test]
    fn test_rejects_out_of_range_addresses() {
        let mut bus = ready_bus(ScriptedController::new());
        let mut buf = [0u8; 2];

        for address in [0x80u8, 0x81, 0xC0, 0xFF] {
            assert_eq!(bus.write(address, &[0x1E], false), Err(BusError::InvalidArgument));
            assert_eq!(bus.read(address, &mut buf, false), Err(BusError::InvalidArgument));
            assert_eq!(
                bus.write_read(address, &[0xA0], &mut buf),
                Err(BusError::InvalidArgument)
            );
            assert_eq!(bus.probe(address), Err(BusError::InvalidArgument));
        }

        assert_eq!(*bus.last_diagnostics(), TransactionDiagnostics::default());
        assert_eq!(bus.release().leg_count, 0);
    }

    #[test]
    fn test_rejects_empty_transfers() {
        let mut bus = ready_bus(ScriptedController::new());

        assert_eq!(bus.write(ADDR, &[], false), Err(BusError::InvalidArgument));
        assert_eq!(bus.read(ADDR, &mut [], false), Err(BusError::InvalidArgument));
        assert_eq!(bus.write_read(ADDR, &[0xA0], &mut []), Err(BusError::InvalidArgument));
        assert_eq!(bus.write_read(ADDR, &[], &mut []), Err(BusError::InvalidArgument));

        assert_eq!(*bus.last_diagnostics(), TransactionDiagnostics::default());
        assert_eq!(bus.release().leg_count, 0);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn out_of_range_address_never_reaches_hardware(address in 0x80u8..=0xFF) {
                let mut bus = ready_bus(ScriptedController::new());
                let mut buf = [0u8; 3];

                prop_assert_eq!(bus.write(address, &[0x48], false), Err(BusError::InvalidArgument));
                prop_assert_eq!(bus.read(address, &mut buf, true), Err(BusError::InvalidArgument));
                prop_assert_eq!(bus.write_read(address, &[0x00], &mut buf), Err(BusError::InvalidArgument));
                prop_assert_eq!(bus.probe(address), Err(BusError::InvalidArgument));
                prop_assert_eq!(bus.release().leg_count, 0);
            }

            #[test]
            fn short_transfer_never_succeeds(requested in 1usize..16, short in 0usize..16) {
                prop_assume!(short < requested);
                let controller = ScriptedController::new().then(Ok(short), 0);
                let mut bus = ready_bus(controller);
                let mut buf = [0u8; 16];

                prop_assert_eq!(
                    bus.read(ADDR, &mut buf[..requested], false),
                    Err(BusError::Transport(TransportError::Io))
                );
            }
        }
    }
}
