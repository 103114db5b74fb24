//! Host command bytes
//!
//! The host controls the bridge with single ASCII bytes, case-insensitive.
//! Unrecognized bytes are ignored.

use crate::variant::Variant;

/// Commands the host can send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostCommand {
    /// Switch protocol variant (full reset)
    SelectVariant(Variant),
    /// Emit a status line with cumulative counters
    Status,
    /// Clear statistics counters
    ClearStats,
    /// Acknowledge and reboot into the firmware-update bootloader
    EnterBootloader,
}

impl HostCommand {
    /// Decode a command byte
    ///
    /// Returns `None` for bytes that are not commands.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte.to_ascii_uppercase() {
            b'N' => Some(HostCommand::SelectVariant(Variant::Narrow)),
            b'O' => Some(HostCommand::SelectVariant(Variant::Wide)),
            b'S' => Some(HostCommand::Status),
            b'R' => Some(HostCommand::ClearStats),
            b'B' => Some(HostCommand::EnterBootloader),
            _ => None,
        }
    }

    /// Canonical (upper-case) command byte
    pub fn to_byte(self) -> u8 {
        match self {
            HostCommand::SelectVariant(Variant::Narrow) => b'N',
            HostCommand::SelectVariant(Variant::Wide) => b'O',
            HostCommand::Status => b'S',
            HostCommand::ClearStats => b'R',
            HostCommand::EnterBootloader => b'B',
        }
    }
}
