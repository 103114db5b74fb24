//! Minimal TOML parser for the bridge configuration
//!
//! Handles only the subset `bridge.toml` uses. It does NOT support the full
//! TOML spec.
//!
//! Supported features:
//! - Key = value pairs (quoted string, integer)
//! - Integers with `_` digit separators (`12_500_000`)
//! - [section] and [section.name] headers
//! - Comments (# ...)

use lvds_protocol::{RowEncoding, Variant};

use super::types::{BridgeConfig, ConfigError, LedPin};

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Bridge,
    Variant(Variant),
}

/// Parse and validate TOML configuration
///
/// Keys that are absent keep their built-in defaults.
pub fn parse_config(input: &str) -> Result<BridgeConfig, ConfigError> {
    let mut config = BridgeConfig::new();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ConfigError::InvalidValue)?;
        apply_value(section, key, value, &mut config)?;
    }

    config.validate()?;
    Ok(config)
}

/// Parse section header like "bridge" or "variant.wide"
fn parse_section_header(header: &str) -> Result<Section, ConfigError> {
    let header = header.trim();
    match header.split_once('.') {
        Some(("variant", name)) => Variant::from_config_name(name.trim())
            .map(Section::Variant)
            .ok_or(ConfigError::InvalidSection),
        Some(_) => Err(ConfigError::InvalidSection),
        None if header == "bridge" => Ok(Section::Bridge),
        None => Err(ConfigError::InvalidSection),
    }
}

/// Split `key = value`, dropping an inline comment
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    let value = match value.find('#') {
        // Make sure # is not inside a string
        Some(hash_pos) if value[..hash_pos].matches('"').count() % 2 == 0 => {
            value[..hash_pos].trim()
        }
        _ => value,
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut BridgeConfig,
) -> Result<(), ConfigError> {
    match section {
        Section::Root => Err(ConfigError::UnknownKey),
        Section::Bridge => {
            match key {
                "default_variant" => {
                    config.default_variant = Variant::from_config_name(parse_string(value)?)
                        .ok_or(ConfigError::InvalidValue)?
                }
                "max_gap_bytes" => config.max_gap_bytes = parse_int(value)?,
                "parse_budget" => config.parse_budget = parse_int(value)?,
                "sender_passes" => config.sender_passes = parse_int(value)?,
                "capture_pin" => config.capture_pin = parse_pin(value)?.pin,
                "led_pin" => config.led = parse_pin(value)?,
                _ => return Err(ConfigError::UnknownKey),
            }
            Ok(())
        }
        Section::Variant(variant) => {
            let d = config.descriptor_mut(variant);
            match key {
                "width" => d.width = parse_int(value)?,
                "active_lines" => d.active_lines = parse_int(value)?,
                "total_lines" => d.total_lines = parse_int(value)?,
                "baud" => d.baud = parse_int(value)?,
                "oversampling" => d.oversampling = parse_int(value)?,
                "row_encoding" => {
                    d.row_encoding = RowEncoding::from_config_name(parse_string(value)?)
                        .ok_or(ConfigError::InvalidValue)?
                }
                _ => return Err(ConfigError::UnknownKey),
            }
            Ok(())
        }
    }
}

/// Parse a quoted string value
fn parse_string(value: &str) -> Result<&str, ConfigError> {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or(ConfigError::InvalidValue)
}

/// Parse an unsigned integer, allowing `_` separators
fn parse_int<T: TryFrom<u32>>(value: &str) -> Result<T, ConfigError> {
    let mut acc: u32 = 0;
    let mut digits = 0;
    for c in value.chars() {
        if c == '_' && digits > 0 {
            continue;
        }
        let digit = c.to_digit(10).ok_or(ConfigError::InvalidValue)?;
        acc = acc
            .checked_mul(10)
            .and_then(|a| a.checked_add(digit))
            .ok_or(ConfigError::InvalidValue)?;
        digits += 1;
    }
    if digits == 0 {
        return Err(ConfigError::InvalidValue);
    }
    T::try_from(acc).map_err(|_| ConfigError::InvalidValue)
}

/// Parse a pin: a bare GPIO number or a string like "gpio25" / "!gpio25"
fn parse_pin(value: &str) -> Result<LedPin, ConfigError> {
    let (pin, inverted) = match parse_int::<u8>(value) {
        Ok(pin) => (pin, false),
        Err(_) => {
            let s = parse_string(value).map_err(|_| ConfigError::InvalidPin)?;
            let (inverted, s) = match s.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, s),
            };
            let number = s.strip_prefix("gpio").ok_or(ConfigError::InvalidPin)?;
            let pin = parse_int(number).map_err(|_| ConfigError::InvalidPin)?;
            (pin, inverted)
        }
    };
    if pin > 47 {
        return Err(ConfigError::InvalidPin);
    }
    Ok(LedPin { pin, inverted })
}
