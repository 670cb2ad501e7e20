//! I2C pin mapping
//!
//! RP2040 has two I2C peripherals (I2C0 and I2C1). Every GPIO can carry
//! one of them: pins repeat in groups of four as SDA0, SCL0, SDA1, SCL1.

/// Highest user GPIO
pub const MAX_GPIO: u8 = 29;

/// I2C peripheral identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cId {
    I2c0,
    I2c1,
}

/// Line role of an I2C-capable pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cLine {
    Sda,
    Scl,
}

/// Determine which I2C peripheral and line a GPIO maps to
pub fn gpio_to_i2c(gpio: u8) -> Option<(I2cId, I2cLine)> {
    if gpio > MAX_GPIO {
        return None;
    }

    let id = if (gpio / 2) % 2 == 0 {
        I2cId::I2c0
    } else {
        I2cId::I2c1
    };
    let line = if gpio % 2 == 0 { I2cLine::Sda } else { I2cLine::Scl };
    Some((id, line))
}

/// Peripheral served by an SDA/SCL pair, if the pair is valid
pub fn i2c_for_pins(sda: u8, scl: u8) -> Option<I2cId> {
    match (gpio_to_i2c(sda)?, gpio_to_i2c(scl)?) {
        ((sda_id, I2cLine::Sda), (scl_id, I2cLine::Scl)) if sda_id == scl_id => Some(sda_id),
        _ => None,
    }
}
