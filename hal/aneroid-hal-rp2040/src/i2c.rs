//! Blocking I2C controller on the RP2040 `DW_apb_i2c` block
//!
//! embassy-rp's blocking driver owns the peripheral and muxes the pins;
//! transfers are then driven directly on the register block so that each
//! leg can:
//! - stop early at a deadline
//! - keep the bus (no STOP) for a following repeated start
//! - report how many bytes moved before an abort
//! - latch the raw `IC_TX_ABRT_SOURCE` bits

use aneroid_hal::{ConfigureError, ControllerFault, I2cConfig, I2cController, LegResult};
use embassy_rp::i2c::{Blocking, I2c, Instance};
use embassy_rp::pac;
use embassy_time::{Duration, Instant};

use crate::pins::{i2c_for_pins, I2cId};

/// Fastest clock the block supports (Fast-mode Plus)
const MAX_FREQUENCY_HZ: u32 = 1_000_000;

/// I2C controller for one RP2040 peripheral
pub struct Rp2040I2c<'d, T: Instance> {
    /// Keeps the peripheral and pins claimed
    _driver: I2c<'d, T, Blocking>,
    id: I2cId,
    regs: pac::i2c::I2c,
    sda_pin: u8,
    scl_pin: u8,
    /// Next leg starts with a repeated start (previous leg held the bus)
    restart_on_next: bool,
    /// Abort bits latched since the last `take_abort_source`
    abort_source: u32,
}

impl<'d, T: Instance> Rp2040I2c<'d, T> {
    /// Wrap an embassy blocking driver
    ///
    /// `id` must name the same peripheral as `T` and the pins must be the
    /// ones the driver was built with; [`configure`](I2cController::configure)
    /// checks the pins against the requested configuration.
    pub fn new(driver: I2c<'d, T, Blocking>, id: I2cId, sda_pin: u8, scl_pin: u8) -> Self {
        let regs = match id {
            I2cId::I2c0 => pac::I2C0,
            I2cId::I2c1 => pac::I2C1,
        };

        Self {
            _driver: driver,
            id,
            regs,
            sda_pin,
            scl_pin,
            restart_on_next: false,
            abort_source: 0,
        }
    }

    fn set_pullups(&self, enable: bool) {
        for pin in [self.sda_pin, self.scl_pin] {
            pac::PADS_BANK0.gpio(usize::from(pin)).modify(|w| {
                w.set_pue(enable);
                w.set_pde(false);
            });
        }
    }

    /// Program SCL high/low counts for `frequency` (pico-sdk timing)
    fn set_frequency(&self, frequency: u32) -> Result<(), ConfigureError> {
        if frequency == 0 || frequency > MAX_FREQUENCY_HZ {
            return Err(ConfigureError::UnsupportedFrequency);
        }

        let clk_base = embassy_rp::clocks::clk_peri_freq();
        let period = (clk_base + frequency / 2) / frequency;
        let lcnt = period * 3 / 5;
        let hcnt = period - lcnt;
        if !(8..=0xFFFF).contains(&hcnt) || !(8..=0xFFFF).contains(&lcnt) {
            return Err(ConfigureError::UnsupportedFrequency);
        }

        // 300 ns hold below 1 MHz, 120 ns at Fast-mode Plus
        let sda_tx_hold = if frequency < MAX_FREQUENCY_HZ {
            (clk_base * 3) / 10_000_000 + 1
        } else {
            (clk_base * 3) / 25_000_000 + 1
        };
        if sda_tx_hold > lcnt - 2 {
            return Err(ConfigureError::UnsupportedFrequency);
        }

        let p = self.regs;
        p.ic_enable().write(|w| w.set_enable(false));
        p.ic_fs_scl_hcnt().write(|w| w.set_ic_fs_scl_hcnt(hcnt as u16));
        p.ic_fs_scl_lcnt().write(|w| w.set_ic_fs_scl_lcnt(lcnt as u16));
        p.ic_fs_spklen()
            .write(|w| w.set_ic_fs_spklen(if lcnt < 16 { 1 } else { (lcnt / 16) as u8 }));
        p.ic_sda_hold()
            .modify(|w| w.set_ic_sda_tx_hold(sda_tx_hold as u16));
        p.ic_enable().write(|w| w.set_enable(true));
        Ok(())
    }

    fn set_target(&self, address: u8) {
        let p = self.regs;
        p.ic_enable().write(|w| w.set_enable(false));
        p.ic_tar().write(|w| w.set_ic_tar(u16::from(address)));
        p.ic_enable().write(|w| w.set_enable(true));
    }

    /// Read and clear the abort source; returns true if anything was set
    fn latch_abort(&mut self) -> bool {
        let reason = self.regs.ic_tx_abrt_source().read().0;
        if reason == 0 {
            return false;
        }
        let _ = self.regs.ic_clr_tx_abrt().read();
        self.abort_source |= reason;
        true
    }

    /// Spin until `done` or the deadline; false on timeout
    fn wait_until(&self, deadline: Instant, mut done: impl FnMut(&pac::i2c::I2c) -> bool) -> bool {
        loop {
            if done(&self.regs) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
        }
    }

    fn finish(&mut self, moved: usize, aborted: bool, timed_out: bool, nostop: bool) -> LegResult {
        self.restart_on_next = nostop;
        if timed_out {
            Err(ControllerFault::Timeout)
        } else if aborted {
            Err(ControllerFault::Generic)
        } else {
            Ok(moved)
        }
    }
}

fn deadline_after(timeout_us: u32) -> Instant {
    Instant::now() + Duration::from_micros(u64::from(timeout_us))
}

impl<T: Instance> I2cController for Rp2040I2c<'_, T> {
    fn configure(&mut self, config: &I2cConfig) -> Result<(), ConfigureError> {
        if config.sda_pin != self.sda_pin
            || config.scl_pin != self.scl_pin
            || i2c_for_pins(config.sda_pin, config.scl_pin) != Some(self.id)
        {
            return Err(ConfigureError::InvalidPin);
        }

        self.set_frequency(config.frequency)?;
        self.set_pullups(config.enable_pullups);

        self.restart_on_next = false;
        self.abort_source = 0;
        Ok(())
    }

    fn write_leg(&mut self, address: u8, data: &[u8], nostop: bool, timeout_us: u32) -> LegResult {
        // The block cannot address a device without a data byte
        if data.is_empty() {
            return Ok(0);
        }

        let deadline = deadline_after(timeout_us);
        self.set_target(address);

        let mut moved = 0;
        let mut aborted = false;
        let mut timed_out = false;
        let last_index = data.len().saturating_sub(1);

        for (i, &byte) in data.iter().enumerate() {
            let first = i == 0;
            let last = i == last_index;
            let restart = first && self.restart_on_next;

            self.regs.ic_data_cmd().write(|w| {
                w.set_restart(restart);
                w.set_stop(last && !nostop);
                w.set_dat(byte);
            });

            // Byte has left the FIFO (or the transfer aborted)
            if !self.wait_until(deadline, |r| r.ic_raw_intr_stat().read().tx_empty()) {
                timed_out = true;
                break;
            }

            aborted = self.latch_abort();

            // An abort always ends with STOP; so does the last byte without nostop
            if aborted || (last && !nostop) {
                if !self.wait_until(deadline, |r| r.ic_raw_intr_stat().read().stop_det()) {
                    timed_out = true;
                    break;
                }
                let _ = self.regs.ic_clr_stop_det().read();
            }

            if aborted {
                break;
            }
            moved += 1;
        }

        self.finish(moved, aborted, timed_out, nostop)
    }

    fn read_leg(&mut self, address: u8, buf: &mut [u8], nostop: bool, timeout_us: u32) -> LegResult {
        // The block cannot address a device without a data byte
        if buf.is_empty() {
            return Ok(0);
        }

        let deadline = deadline_after(timeout_us);
        self.set_target(address);

        let mut moved = 0;
        let mut aborted = false;
        let mut timed_out = false;
        let last_index = buf.len().saturating_sub(1);

        for (i, slot) in buf.iter_mut().enumerate() {
            let first = i == 0;
            let last = i == last_index;
            let restart = first && self.restart_on_next;

            if !self.wait_until(deadline, |r| r.ic_status().read().tfnf()) {
                timed_out = true;
                break;
            }

            self.regs.ic_data_cmd().write(|w| {
                w.set_restart(restart);
                w.set_stop(last && !nostop);
                w.set_cmd(true);
            });

            let mut waiting = true;
            while waiting {
                aborted = self.latch_abort();
                if aborted || self.regs.ic_rxflr().read().rxflr() > 0 {
                    waiting = false;
                } else if Instant::now() >= deadline {
                    timed_out = true;
                    waiting = false;
                }
            }

            if aborted || timed_out {
                break;
            }

            *slot = self.regs.ic_data_cmd().read().dat();
            moved += 1;
        }

        self.finish(moved, aborted, timed_out, nostop)
    }

    fn take_abort_source(&mut self) -> u32 {
        core::mem::take(&mut self.abort_source)
    }

    fn shutdown(&mut self) {
        self.regs.ic_enable().write(|w| w.set_enable(false));
        self.set_pullups(false);
        self.restart_on_next = false;
        self.abort_source = 0;
    }
}
