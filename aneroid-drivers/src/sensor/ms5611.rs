//! MS5611 barometric pressure sensor (I2C)
//!
//! The MS5611 is a 24-bit barometric pressure and temperature sensor with
//! eight words of factory calibration PROM protected by a 4-bit CRC.
//!
//! # Protocol
//!
//! Every operation is a single command byte:
//! - `0x1E`: reset and reload the PROM (~2.8 ms)
//! - `0xA0 + 2*i`: select PROM word `i`, then read 2 bytes (big-endian)
//! - `0x40 + offset`: start pressure conversion (D1)
//! - `0x50 + offset`: start temperature conversion (D2)
//! - `0x00`: select the ADC result, then read 3 bytes (big-endian)
//!
//! The conversion offset selects the oversampling ratio. The device does
//! not signal completion; the driver waits the datasheet maximum instead.
//!
//! # Compensation
//!
//! Raw counts are turned into 0.01 °C and Pa with the datasheet's 64-bit
//! fixed-point formulas, including the second-order correction below
//! 20 °C and the extra term below -15 °C.

use core::fmt;

use aneroid_core::bus::{BusError, BusTransport};
use aneroid_core::traits::{Barometer, Measurement, Oversampling};
use aneroid_hal::i2c::is_valid_address;
use aneroid_hal::I2cController;
use embedded_hal::delay::DelayNs;

/// MS5611 command bytes
pub mod cmd {
    /// Reset sequence, reloads the PROM
    pub const RESET: u8 = 0x1E;
    /// Select the 24-bit conversion result
    pub const ADC_READ: u8 = 0x00;
    /// First PROM word; word `i` is at `PROM_READ + 2 * i`
    pub const PROM_READ: u8 = 0xA0;
    /// Pressure conversion base
    pub const CONVERT_D1: u8 = 0x40;
    /// Temperature conversion base
    pub const CONVERT_D2: u8 = 0x50;
}

/// Default address with CSB pulled low
pub const DEFAULT_ADDRESS: u8 = 0x77;

/// Settle time after reset while the PROM reloads
pub const RESET_DELAY_MS: u32 = 3;

/// Added to every datasheet conversion time
pub const CONVERSION_MARGIN_US: u32 = 200;

/// Upper bound for a plausible compensated pressure
pub const MAX_PRESSURE_PA: i64 = 200_000;

/// Largest raw ADC count (24 bits)
const ADC_MAX: u32 = 0x00FF_FFFF;

/// Number of PROM words
pub const PROM_WORDS: usize = 8;

/// MS5611 driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ms5611Error {
    /// Bad argument (address out of range, raw count wider than 24 bits)
    InvalidArgument,
    /// Read attempted before a successful init
    NotInitialized,
    /// PROM is all zeros or all ones (usually nobody answered)
    InvalidProm,
    /// PROM answered but the CRC does not match
    Checksum { stored: u8, computed: u8 },
    /// Compensated pressure outside the sanity bound
    OutOfRange,
    /// Bus transport failure, passed through unchanged
    Bus(BusError),
}

impl Ms5611Error {
    /// Stable name for logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Ms5611Error::InvalidArgument => "invalid argument",
            Ms5611Error::NotInitialized => "sensor not initialized",
            Ms5611Error::InvalidProm => "invalid prom",
            Ms5611Error::Checksum { .. } => "prom crc mismatch",
            Ms5611Error::OutOfRange => "pressure out of range",
            Ms5611Error::Bus(e) => e.as_str(),
        }
    }
}

impl fmt::Display for Ms5611Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ms5611Error::Checksum { stored, computed } => {
                write!(f, "prom crc mismatch (stored {:#x}, computed {:#x})", stored, computed)
            }
            Ms5611Error::Bus(e) => write!(f, "bus: {}", e),
            other => f.write_str(other.as_str()),
        }
    }
}

impl From<BusError> for Ms5611Error {
    fn from(e: BusError) -> Self {
        Ms5611Error::Bus(e)
    }
}

/// Conversion settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ms5611Config {
    /// Applied to both temperature and pressure
    pub oversampling: Oversampling,
}

impl Ms5611Config {
    /// Total wait after issuing a conversion command
    pub const fn conversion_wait_us(&self) -> u32 {
        self.oversampling.conversion_time_us() + CONVERSION_MARGIN_US
    }
}

/// Factory calibration PROM
///
/// Word 0 is factory data, words 1-6 are the coefficients C1-C6 and the
/// low nibble of word 7 is the CRC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Prom(pub [u16; PROM_WORDS]);

impl Prom {
    /// CRC nibble stored in word 7
    pub const fn stored_crc(&self) -> u8 {
        (self.0[7] & 0x000F) as u8
    }

    /// Compute the CRC-4 over all eight words
    ///
    /// Word 7 enters with its CRC nibble cleared; every other bit is covered.
    pub fn crc4(&self) -> u8 {
        let mut words = self.0;
        words[7] &= 0xFFF0;

        let mut rem: u16 = 0;
        for cnt in 0..16 {
            let word = words[cnt >> 1];
            rem ^= if cnt & 1 == 1 { word & 0x00FF } else { word >> 8 };

            for _ in 0..8 {
                rem = if rem & 0x8000 != 0 {
                    (rem << 1) ^ 0x3000
                } else {
                    rem << 1
                };
            }
        }

        ((rem >> 12) & 0x000F) as u8
    }

    /// Reject a PROM that is uniformly 0x0000 or uniformly 0xFFFF
    pub fn sanity_check(&self) -> Result<(), Ms5611Error> {
        let all_zero = self.0.iter().all(|&w| w == 0x0000);
        let all_ones = self.0.iter().all(|&w| w == 0xFFFF);
        if all_zero || all_ones {
            return Err(Ms5611Error::InvalidProm);
        }
        Ok(())
    }

    /// Sanity check, then CRC check
    pub fn verify(&self) -> Result<(), Ms5611Error> {
        self.sanity_check()?;

        let stored = self.stored_crc();
        let computed = self.crc4();
        if stored != computed {
            return Err(Ms5611Error::Checksum { stored, computed });
        }
        Ok(())
    }

    /// Working coefficients C1-C6
    pub fn coefficients(&self) -> Coefficients {
        Coefficients {
            c1: i64::from(self.0[1]),
            c2: i64::from(self.0[2]),
            c3: i64::from(self.0[3]),
            c4: i64::from(self.0[4]),
            c5: i64::from(self.0[5]),
            c6: i64::from(self.0[6]),
        }
    }
}

/// Compensation coefficients from PROM words 1-6
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coefficients {
    /// Pressure sensitivity
    pub c1: i64,
    /// Pressure offset
    pub c2: i64,
    /// Temperature coefficient of pressure sensitivity
    pub c3: i64,
    /// Temperature coefficient of pressure offset
    pub c4: i64,
    /// Reference temperature
    pub c5: i64,
    /// Temperature coefficient of the temperature
    pub c6: i64,
}

/// Low-temperature corrections subtracted from TEMP, OFF and SENS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct SecondOrder {
    t2: i64,
    off2: i64,
    sens2: i64,
}

fn second_order(dt: i64, temp: i64) -> SecondOrder {
    if temp >= 2000 {
        return SecondOrder::default();
    }

    let t = temp - 2000;
    let mut off2 = (5 * t * t) >> 1;
    let mut sens2 = (5 * t * t) >> 2;

    if temp < -1500 {
        let t2 = temp + 1500;
        off2 += 7 * t2 * t2;
        sens2 += (11 * t2 * t2) >> 1;
    }

    SecondOrder {
        t2: (dt * dt) >> 31,
        off2,
        sens2,
    }
}

/// Turn raw counts into a reading
///
/// # Arguments
/// * `coeffs` - Calibration coefficients
/// * `d1` - Raw pressure count (24-bit)
/// * `d2` - Raw temperature count (24-bit)
pub fn compensate(coeffs: &Coefficients, d1: u32, d2: u32) -> Result<Measurement, Ms5611Error> {
    if d1 > ADC_MAX || d2 > ADC_MAX {
        return Err(Ms5611Error::InvalidArgument);
    }

    let dt = i64::from(d2) - (coeffs.c5 << 8);
    let temp = 2000 + ((dt * coeffs.c6) >> 23);
    let off = (coeffs.c2 << 16) + ((coeffs.c4 * dt) >> 7);
    let sens = (coeffs.c1 << 15) + ((coeffs.c3 * dt) >> 8);

    let low = second_order(dt, temp);
    let temp = temp - low.t2;
    let off = off - low.off2;
    let sens = sens - low.sens2;

    let pressure = (((i64::from(d1) * sens) >> 21) - off) >> 15;
    if !(0..=MAX_PRESSURE_PA).contains(&pressure) {
        return Err(Ms5611Error::OutOfRange);
    }

    Ok(Measurement {
        temperature_centi_c: i32::try_from(temp).map_err(|_| Ms5611Error::OutOfRange)?,
        pressure_pa: pressure as u32,
    })
}

/// MS5611 on a borrowed bus
///
/// The device starts uninitialized; [`init`](Self::init) resets it and
/// loads the PROM. Once initialized it stays initialized; a failed read
/// does not change that.
pub struct Ms5611<'a, C, D> {
    bus: &'a mut BusTransport<C>,
    delay: D,
    address: u8,
    /// Verified PROM; `Some` once initialized
    prom: Option<Prom>,
}

impl<'a, C: I2cController, D: DelayNs> Ms5611<'a, C, D> {
    /// Create an uninitialized driver
    pub fn new(bus: &'a mut BusTransport<C>, delay: D, address: u8) -> Result<Self, Ms5611Error> {
        if !is_valid_address(address) {
            return Err(Ms5611Error::InvalidArgument);
        }

        Ok(Self {
            bus,
            delay,
            address,
            prom: None,
        })
    }

    /// Create and initialize in one step
    pub fn open(bus: &'a mut BusTransport<C>, delay: D, address: u8) -> Result<Self, Ms5611Error> {
        let mut sensor = Self::new(bus, delay, address)?;
        sensor.init()?;
        Ok(sensor)
    }

    /// Reset, then load and verify the PROM
    ///
    /// Starts from scratch: on failure the driver is left uninitialized.
    pub fn init(&mut self) -> Result<(), Ms5611Error> {
        self.prom = None;

        self.reset()?;
        let prom = self.read_prom()?;
        prom.verify()?;

        self.prom = Some(prom);
        Ok(())
    }

    /// Send the reset command and wait for the PROM reload
    pub fn reset(&mut self) -> Result<(), Ms5611Error> {
        self.bus.write(self.address, &[cmd::RESET], false)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        Ok(())
    }

    /// Read all eight PROM words (no validation)
    pub fn read_prom(&mut self) -> Result<Prom, Ms5611Error> {
        let mut words = [0u16; PROM_WORDS];
        for (i, word) in words.iter_mut().enumerate() {
            let mut buf = [0u8; 2];
            let command = cmd::PROM_READ + 2 * i as u8;
            self.bus.write_read(self.address, &[command], &mut buf)?;
            *word = u16::from_be_bytes(buf);
        }
        Ok(Prom(words))
    }

    /// Take one reading: temperature conversion, pressure conversion,
    /// then compensation
    ///
    /// Any bus failure aborts the read and is returned as-is.
    pub fn read(&mut self, config: &Ms5611Config) -> Result<Measurement, Ms5611Error> {
        let coeffs = self
            .prom
            .as_ref()
            .map(Prom::coefficients)
            .ok_or(Ms5611Error::NotInitialized)?;

        let d2 = self.convert(cmd::CONVERT_D2, config)?;
        let d1 = self.convert(cmd::CONVERT_D1, config)?;

        compensate(&coeffs, d1, d2)
    }

    fn convert(&mut self, base: u8, config: &Ms5611Config) -> Result<u32, Ms5611Error> {
        let command = base + config.oversampling.command_offset();
        self.bus.write(self.address, &[command], false)?;

        self.delay.delay_us(config.conversion_wait_us());

        let mut buf = [0u8; 3];
        self.bus.write_read(self.address, &[cmd::ADC_READ], &mut buf)?;
        Ok(u32::from_be_bytes([0, buf[0], buf[1], buf[2]]))
    }

    /// Device address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Check if init completed
    pub fn is_initialized(&self) -> bool {
        self.prom.is_some()
    }

    /// Verified PROM, if initialized
    pub fn prom(&self) -> Option<&Prom> {
        self.prom.as_ref()
    }

    /// Give the delay provider back, ending the bus borrow
    pub fn release(self) -> D {
        self.delay
    }
}

impl<C: I2cController, D: DelayNs> Barometer for Ms5611<'_, C, D> {
    type Error = Ms5611Error;

    fn measure(&mut self, oversampling: Oversampling) -> Result<Measurement, Ms5611Error> {
        self.read(&Ms5611Config { oversampling })
    }

    fn is_ready(&self) -> bool {
        self.is_initialized()
    }
}
