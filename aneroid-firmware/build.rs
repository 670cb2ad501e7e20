//! Build script for aneroid-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates board.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Pins the I2C0 peripheral is wired to on this board
const WIRED_SDA: i64 = 8;
const WIRED_SCL: i64 = 9;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}

/// Validate board.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=board.toml");

    let config_path = Path::new("board.toml");
    if !config_path.exists() {
        fail("board.toml not found", &["The firmware embeds board.toml; create one next to Cargo.toml."]);
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read board.toml", &[e.to_string()]),
    };

    let config: toml::Table = match toml::from_str(&content) {
        Ok(table) => table,
        Err(e) => {
            let lines: Vec<String> = e.to_string().lines().map(str::to_string).collect();
            fail("Invalid TOML syntax in board.toml", &lines[..]);
        }
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (name, section) in &config {
        let Some(table) = section.as_table() else {
            errors.push(format!("'{}' must be a [section]", name));
            continue;
        };
        match name.as_str() {
            "bus" => validate_bus(table, &mut errors, &mut warnings),
            "sensor" => validate_sensor(table, &mut errors),
            "telemetry" => validate_telemetry(table, &mut errors),
            other => errors.push(format!("unknown section [{}]", other)),
        }
    }

    if !errors.is_empty() {
        fail("Invalid board configuration", &errors[..]);
    }

    // The firmware parses the embedded file with this parser at startup
    if let Err(e) = aneroid_core::config::parse_board_config(&content) {
        fail("board.toml rejected by the firmware parser", &[e.to_string()]);
    }

    for warning in warnings {
        println!("cargo:warning=board.toml: {}", warning);
    }
    println!("cargo:warning=board.toml validated successfully");
}

fn validate_bus(table: &toml::Table, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    for (key, value) in table {
        match key.as_str() {
            "frequency_hz" => check_int_range(value, "[bus] frequency_hz", 1, 1_000_000, errors),
            "timeout_us" => check_int_range(value, "[bus] timeout_us", 1, u32::MAX as i64, errors),
            "sda_pin" | "scl_pin" => {
                let wired = if key == "sda_pin" { WIRED_SDA } else { WIRED_SCL };
                match pin_number(value) {
                    Some(pin) if (0..=29).contains(&pin) => {
                        if pin != wired {
                            warnings.push(format!(
                                "[bus] {} = {} but this board wires I2C0 to GPIO{}",
                                key, pin, wired
                            ));
                        }
                    }
                    _ => errors.push(format!("[bus] {} must be 0-29 or \"gpioN\"", key)),
                }
            }
            "enable_pullups" => {
                if !value.is_bool() {
                    errors.push("[bus] enable_pullups must be true or false".to_string());
                }
            }
            other => errors.push(format!("[bus] unknown key '{}'", other)),
        }
    }
}

fn validate_sensor(table: &toml::Table, errors: &mut Vec<String>) {
    for (key, value) in table {
        match key.as_str() {
            "address" => check_int_range(value, "[sensor] address", 0, 0x7F, errors),
            "oversampling" => match value.as_integer() {
                Some(256 | 512 | 1024 | 2048 | 4096) => {}
                _ => errors.push("[sensor] oversampling must be 256, 512, 1024, 2048 or 4096".to_string()),
            },
            other => errors.push(format!("[sensor] unknown key '{}'", other)),
        }
    }
}

fn validate_telemetry(table: &toml::Table, errors: &mut Vec<String>) {
    for (key, value) in table {
        match key.as_str() {
            "period_ms" => check_int_range(value, "[telemetry] period_ms", 1, u32::MAX as i64, errors),
            other => errors.push(format!("[telemetry] unknown key '{}'", other)),
        }
    }
}

fn check_int_range(value: &toml::Value, what: &str, min: i64, max: i64, errors: &mut Vec<String>) {
    match value.as_integer() {
        Some(v) if (min..=max).contains(&v) => {}
        _ => errors.push(format!("{} must be an integer in {}..={}", what, min, max)),
    }
}

/// Accept `8` or `"gpio8"`
fn pin_number(value: &toml::Value) -> Option<i64> {
    match value {
        toml::Value::Integer(pin) => Some(*pin),
        toml::Value::String(s) => s.strip_prefix("gpio")?.parse().ok(),
        _ => None,
    }
}

/// Abort the build with a boxed error message
fn fail<S: AsRef<str>>(title: &str, lines: &[S]) -> ! {
    let body = lines
        .iter()
        .map(|line| {
            let line = line.as_ref();
            let truncated = if line.len() > 62 {
                format!("{}...", &line[..59])
            } else {
                line.to_string()
            };
            format!("║  • {:<62} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n");

    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<57}║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}
