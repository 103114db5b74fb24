//! Configuration loading
//!
//! bridge.toml is embedded at build time (and validated by build.rs). A
//! parse failure here means the two checks disagree, so fall back to the
//! built-in variant table rather than refusing to boot.

use defmt::*;

use lvds_core::config::{parse_config, BridgeConfig};
use lvds_protocol::Variant;

/// Embedded configuration (compiled into firmware)
/// Edit bridge.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../bridge.toml");

/// Parse the embedded configuration
pub fn load_config() -> BridgeConfig {
    let config = match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration successfully");
            config
        }
        Err(e) => {
            error!("Failed to parse embedded config: {:?}", e);
            error!("Using built-in defaults");
            BridgeConfig::default()
        }
    };

    for variant in [Variant::Narrow, Variant::Wide] {
        let d = config.descriptor(variant);
        info!(
            "{}: {}x{} of {} lines, {} baud, {}x oversampling",
            variant.name(),
            d.width,
            d.active_lines,
            d.total_lines,
            d.baud,
            d.oversampling
        );
    }
    info!(
        "Default variant {}, gap budget {}, parse budget {}, {} sender passes",
        config.default_variant.name(),
        config.max_gap_bytes,
        config.parse_budget,
        config.sender_passes
    );

    config
}
