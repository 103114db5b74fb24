//! Configuration type definitions

use lvds_protocol::{ProtocolDescriptor, Variant};

use crate::parser::DEFAULT_MAX_GAP_BYTES;
use crate::sender::DEFAULT_SENDER_PASSES;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of ring bytes parsed per polling step
pub const DEFAULT_PARSE_BUDGET: u16 = 8192;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Invalid section header
    InvalidSection,
    /// Key not recognised in its section
    UnknownKey,
    /// Invalid value type or out-of-range value
    InvalidValue,
    /// Invalid pin string
    InvalidPin,
    /// Variant geometry does not fit the bridge buffers
    InvalidGeometry(Variant),
    /// Oversampling factor without a capture program
    UnsupportedOversampling(Variant),
    /// A budget or pass count of zero
    ZeroLimit,
}

/// Status LED pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LedPin {
    /// GPIO number
    pub pin: u8,
    /// Active low
    pub inverted: bool,
}

/// Bridge configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BridgeConfig {
    /// Variant selected at power-on
    pub default_variant: Variant,
    /// Filler bytes tolerated between aligned lines
    pub max_gap_bytes: u16,
    /// Ring bytes parsed per polling step
    pub parse_budget: u16,
    /// Chunk writes attempted per sender poll
    pub sender_passes: u8,
    /// GPIO carrying the panel serial stream
    pub capture_pin: u8,
    /// Status LED
    pub led: LedPin,
    /// Narrow variant parameters
    pub narrow: ProtocolDescriptor,
    /// Wide variant parameters
    pub wide: ProtocolDescriptor,
}

impl BridgeConfig {
    pub const fn new() -> Self {
        Self {
            default_variant: Variant::Narrow,
            max_gap_bytes: DEFAULT_MAX_GAP_BYTES,
            parse_budget: DEFAULT_PARSE_BUDGET,
            sender_passes: DEFAULT_SENDER_PASSES,
            capture_pin: 2,
            led: LedPin {
                pin: 25,
                inverted: false,
            },
            narrow: ProtocolDescriptor::NARROW,
            wide: ProtocolDescriptor::WIDE,
        }
    }

    /// Descriptor configured for a variant
    pub fn descriptor(&self, variant: Variant) -> ProtocolDescriptor {
        match variant {
            Variant::Narrow => self.narrow,
            Variant::Wide => self.wide,
        }
    }

    pub fn descriptor_mut(&mut self, variant: Variant) -> &mut ProtocolDescriptor {
        match variant {
            Variant::Narrow => &mut self.narrow,
            Variant::Wide => &mut self.wide,
        }
    }

    /// Check limits and that both variants fit the fixed buffers
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_gap_bytes == 0 || self.parse_budget == 0 || self.sender_passes == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        for variant in [Variant::Narrow, Variant::Wide] {
            let descriptor = self.descriptor(variant);
            if !descriptor.fits_buffers() {
                return Err(ConfigError::InvalidGeometry(variant));
            }
            if !matches!(descriptor.oversampling, 4 | 8) || descriptor.baud == 0 {
                return Err(ConfigError::UnsupportedOversampling(variant));
            }
        }
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}
