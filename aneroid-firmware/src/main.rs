//! Aneroid - Barometric Telemetry Firmware
//!
//! Main firmware binary for an RP2040 board with an MS5611 (GY-63)
//! pressure sensor on I2C0. Reads temperature and pressure on a fixed
//! period, logs them and encodes a telemetry frame for the uplink.
//!
//! Named after the aneroid barometer, which measures air pressure with a
//! sealed capsule instead of a liquid column.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::i2c::{self, I2c};
use embassy_time::{Delay, Duration, Instant, Ticker};
use {defmt_rtt as _, panic_probe as _};

use aneroid_core::bus::BusTransport;
use aneroid_core::traits::{Barometer, Oversampling};
use aneroid_drivers::sensor::Ms5611;
use aneroid_hal_rp2040::{I2cId, Rp2040I2c};
use aneroid_protocol::{TelemetryEncoder, TextLineEncoder};

mod board;
mod publish;

/// Main entry point
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Aneroid firmware starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = board::load_config();

    // embassy-rp muxes the pins; the bus transport programs clock and pull-ups
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = config.bus.frequency_hz;
    let driver = I2c::new_blocking(p.I2C0, p.PIN_9, p.PIN_8, i2c_config);
    let controller = Rp2040I2c::new(driver, I2cId::I2c0, board::SDA_GPIO, board::SCL_GPIO);

    let mut bus = BusTransport::new(controller);
    if let Err(e) = bus.init(&config.bus) {
        fatal("bus init", e.as_str());
    }
    info!(
        "I2C0 ready: {} Hz, timeout {} us, pull-ups {}",
        config.bus.frequency_hz, config.bus.timeout_us, config.bus.enable_pullups
    );

    let address = config.sensor.address;
    match bus.probe(address) {
        Ok(()) => info!("Device ACK at 0x{:02x}", address),
        Err(e) => warn!(
            "No ACK at 0x{:02x}: {} ({})",
            address,
            e.as_str(),
            bus.last_diagnostics()
        ),
    }

    let mut sensor = match Ms5611::open(&mut bus, Delay, address) {
        Ok(sensor) => sensor,
        Err(e) => {
            error!("Last transaction: {}", bus.last_diagnostics());
            fatal("ms5611 init", e.as_str());
        }
    };
    info!("MS5611 ready, PROM {}", sensor.prom());

    let mut encoder = TextLineEncoder::new();
    run(
        &mut sensor,
        config.sensor.oversampling,
        config.telemetry.period_ms,
        &mut encoder,
    )
    .await
}

/// Periodic read, log and publish loop
///
/// A failed read is logged and the next period tries again; the sensor
/// stays initialized.
async fn run<B, E>(sensor: &mut B, oversampling: Oversampling, period_ms: u32, encoder: &mut E) -> !
where
    B: Barometer,
    B::Error: Format,
    E: TelemetryEncoder,
{
    info!(
        "Sampling every {} ms at OSR {}",
        period_ms,
        oversampling.ratio()
    );

    let mut ticker = Ticker::every(Duration::from_millis(u64::from(period_ms)));
    let start = Instant::now();

    loop {
        ticker.next().await;

        let reading = match sensor.measure(oversampling) {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Sensor read failed: {}", e);
                continue;
            }
        };

        info!(
            "T={=f32} C, P={} Pa",
            reading.temperature_c(),
            reading.pressure_pa
        );

        let now_ms = start.elapsed().as_millis();
        if let Some(frame) = encoder.encode(now_ms, &reading) {
            publish::publish_frame(&frame);
        }
    }
}

/// Log a fatal initialization error and park the core
fn fatal(step: &str, reason: &str) -> ! {
    error!("{} failed: {}", step, reason);
    loop {
        cortex_m::asm::wfi();
    }
}
