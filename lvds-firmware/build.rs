//! Build script for lvds-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates bridge.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Largest pixel grid one assembly buffer holds
const MAX_FRAME_BYTES: i64 = 320 * 84;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate bridge.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=bridge.toml");

    let config_path = Path::new("bridge.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: bridge.toml not found!                                   ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds bridge.toml as its configuration.           ║\n\
            ║  Please create one in the lvds-firmware directory.               ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read bridge.toml                               ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in bridge.toml                       ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_bridge(&config, &mut errors);
    validate_variants(&config, &mut errors);
    report("Invalid bridge configuration", &errors);

    println!("cargo:warning=bridge.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn report(title: &str, errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

fn int_in(table: &toml::Table, key: &str, min: i64, max: i64, section: &str, errors: &mut Vec<String>) {
    match table.get(key) {
        None => {}
        Some(toml::Value::Integer(v)) if (min..=max).contains(v) => {}
        Some(toml::Value::Integer(_)) => {
            errors.push(format!("[{}] {} must be {}-{}", section, key, min, max))
        }
        Some(_) => errors.push(format!("[{}] {} must be an integer", section, key)),
    }
}

/// Validate the [bridge] section
fn validate_bridge(config: &toml::Value, errors: &mut Vec<String>) {
    let bridge = match config.get("bridge") {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            errors.push("[bridge] must be a table".to_string());
            return;
        }
        None => return,
    };

    for key in bridge.keys() {
        if ![
            "default_variant",
            "max_gap_bytes",
            "parse_budget",
            "sender_passes",
            "capture_pin",
            "led_pin",
        ]
        .contains(&key.as_str())
        {
            errors.push(format!("[bridge] unknown key '{}'", key));
        }
    }

    if let Some(v) = bridge.get("default_variant") {
        if !matches!(v.as_str(), Some("narrow") | Some("wide")) {
            errors.push("[bridge] default_variant must be 'narrow' or 'wide'".to_string());
        }
    }

    int_in(bridge, "max_gap_bytes", 1, 65535, "bridge", errors);
    int_in(bridge, "parse_budget", 1, 65535, "bridge", errors);
    int_in(bridge, "sender_passes", 1, 255, "bridge", errors);
    for key in ["capture_pin", "led_pin"] {
        validate_pin(bridge, key, errors);
    }
}

/// A pin is a bare GPIO number or a string like "gpio25" / "!gpio25"
fn validate_pin(table: &toml::Table, key: &str, errors: &mut Vec<String>) {
    let number = match table.get(key) {
        None => return,
        Some(toml::Value::Integer(n)) => Some(*n),
        Some(toml::Value::String(s)) => s
            .trim_start_matches('!')
            .strip_prefix("gpio")
            .and_then(|n| n.parse::<i64>().ok()),
        Some(_) => None,
    };
    match number {
        Some(0..=47) => {}
        _ => errors.push(format!("[bridge] {} must be a GPIO 0-47", key)),
    }
}

/// Validate the [variant.*] sections
fn validate_variants(config: &toml::Value, errors: &mut Vec<String>) {
    let variants = match config.get("variant") {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            errors.push("[variant] must contain [variant.narrow] / [variant.wide]".to_string());
            return;
        }
        None => return,
    };

    for (name, variant) in variants {
        let section = format!("variant.{}", name);
        if name != "narrow" && name != "wide" {
            errors.push(format!("[{}] unknown variant", section));
            continue;
        }
        let variant = match variant {
            toml::Value::Table(t) => t,
            _ => {
                errors.push(format!("[{}] must be a table", section));
                continue;
            }
        };

        int_in(variant, "width", 1, 320, &section, errors);
        int_in(variant, "active_lines", 1, 84, &section, errors);
        int_in(variant, "total_lines", 1, 256, &section, errors);
        int_in(variant, "baud", 1, u32::MAX as i64, &section, errors);

        if let Some(v) = variant.get("oversampling") {
            if !matches!(v.as_integer(), Some(4) | Some(8)) {
                errors.push(format!("[{}] oversampling must be 4 or 8", section));
            }
        }

        if let Some(v) = variant.get("row_encoding") {
            if !matches!(v.as_str(), Some("parity_masked") | Some("direct")) {
                errors.push(format!(
                    "[{}] row_encoding must be 'parity_masked' or 'direct'",
                    section
                ));
            }
        }

        let width = variant.get("width").and_then(|v| v.as_integer());
        let active = variant.get("active_lines").and_then(|v| v.as_integer());
        let total = variant.get("total_lines").and_then(|v| v.as_integer());

        if let (Some(a), Some(t)) = (active, total) {
            if a > t {
                errors.push(format!("[{}] active_lines exceeds total_lines", section));
            }
        }
        if let (Some(w), Some(a)) = (width, active) {
            if w * a > MAX_FRAME_BYTES {
                errors.push(format!("[{}] frame exceeds {} bytes", section, MAX_FRAME_BYTES));
            }
        }
        if variant.get("row_encoding").and_then(|v| v.as_str()) == Some("parity_masked") {
            if let Some(t) = total {
                if t > 128 {
                    errors.push(format!("[{}] parity_masked rows allow at most 128 lines", section));
                }
            }
        }
    }
}
