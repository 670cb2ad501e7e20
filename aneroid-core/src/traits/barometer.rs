//! Barometric sensor trait and shared measurement types

/// Oversampling ratio applied to a conversion
///
/// Higher ratios give more resolution at the cost of a longer
/// conversion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oversampling {
    Osr256,
    Osr512,
    Osr1024,
    Osr2048,
    /// Highest resolution, slowest
    #[default]
    Osr4096,
}

impl Oversampling {
    /// All ratios, fastest first
    pub const ALL: [Oversampling; 5] = [
        Oversampling::Osr256,
        Oversampling::Osr512,
        Oversampling::Osr1024,
        Oversampling::Osr2048,
        Oversampling::Osr4096,
    ];

    /// Numeric ratio
    pub const fn ratio(self) -> u16 {
        match self {
            Oversampling::Osr256 => 256,
            Oversampling::Osr512 => 512,
            Oversampling::Osr1024 => 1024,
            Oversampling::Osr2048 => 2048,
            Oversampling::Osr4096 => 4096,
        }
    }

    /// Map a numeric ratio; anything unrecognised selects 4096
    pub const fn from_ratio(ratio: u16) -> Self {
        match ratio {
            256 => Oversampling::Osr256,
            512 => Oversampling::Osr512,
            1024 => Oversampling::Osr1024,
            2048 => Oversampling::Osr2048,
            _ => Oversampling::Osr4096,
        }
    }

    /// Offset added to the conversion command base
    pub const fn command_offset(self) -> u8 {
        match self {
            Oversampling::Osr256 => 0,
            Oversampling::Osr512 => 2,
            Oversampling::Osr1024 => 4,
            Oversampling::Osr2048 => 6,
            Oversampling::Osr4096 => 8,
        }
    }

    /// Datasheet maximum conversion time in microseconds
    pub const fn conversion_time_us(self) -> u32 {
        match self {
            Oversampling::Osr256 => 600,
            Oversampling::Osr512 => 1170,
            Oversampling::Osr1024 => 2280,
            Oversampling::Osr2048 => 4540,
            Oversampling::Osr4096 => 9040,
        }
    }
}

/// One compensated reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Temperature in 0.01 °C (2007 = 20.07 °C)
    pub temperature_centi_c: i32,
    /// Pressure in pascals (equal to 0.01 mbar)
    pub pressure_pa: u32,
}

impl Measurement {
    /// Temperature in degrees Celsius, for display
    pub fn temperature_c(&self) -> f32 {
        self.temperature_centi_c as f32 / 100.0
    }
}

/// Trait for barometric pressure sensors
///
/// Implementations run the whole conversion sequence synchronously and
/// return a compensated reading or the driver's own error type.
pub trait Barometer {
    type Error;

    /// Take one temperature + pressure reading
    fn measure(&mut self, oversampling: Oversampling) -> Result<Measurement, Self::Error>;

    /// Check if the sensor completed its initialization
    fn is_ready(&self) -> bool;
}
