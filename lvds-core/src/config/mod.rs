//! Bridge configuration
//!
//! Parsed at boot from the TOML file embedded in the firmware image.

pub mod parse;
pub mod types;

pub use parse::parse_config;
pub use types::*;
