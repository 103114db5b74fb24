//! Panel protocol variants
//!
//! A variant fixes the geometry and bit rate of the panel's line stream.
//! Exactly one variant is active at a time; switching resets the bridge.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Line record synchronization byte
pub const SYNC_BYTE: u8 = 0x5D;

/// Bytes in a line record besides the pixel payload (sync + row + CRC16)
pub const LINE_OVERHEAD: usize = 4;

/// Widest pixel row any variant may use
pub const MAX_PIXEL_WIDTH: usize = 320;

/// Most active lines any variant may use
pub const MAX_ACTIVE_LINES: usize = 84;

/// Largest pixel grid held by one assembly buffer
pub const MAX_FRAME_BYTES: usize = MAX_PIXEL_WIDTH * MAX_ACTIVE_LINES;

/// Largest line record on the wire
pub const MAX_LINE_RECORD_SIZE: usize = MAX_PIXEL_WIDTH + LINE_OVERHEAD;

/// Built-in protocol variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Variant {
    /// Narrow panel, fast bit rate, 8× oversampled (256×64 active)
    #[default]
    Narrow,
    /// Wide panel, slower oversampling, 4× oversampled (320×80 active)
    Wide,
}

impl Variant {
    /// Upper-case name used in the status line
    pub fn name(self) -> &'static str {
        match self {
            Variant::Narrow => "NARROW",
            Variant::Wide => "WIDE",
        }
    }

    /// Parse the lower-case configuration name
    pub fn from_config_name(name: &str) -> Option<Self> {
        match name {
            "narrow" => Some(Variant::Narrow),
            "wide" => Some(Variant::Wide),
            _ => None,
        }
    }
}

/// How the row-address byte of a line record is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RowEncoding {
    /// `[parity:1][row:7]`, parity bit is masked off (row 0 = 0x80)
    ParityMasked,
    /// Raw row number (parity is checked by the serial framing)
    Direct,
}

impl RowEncoding {
    /// Decode a raw row byte into a row address
    #[inline]
    pub fn decode(self, raw: u8) -> u16 {
        match self {
            RowEncoding::ParityMasked => u16::from(raw & 0x7F),
            RowEncoding::Direct => u16::from(raw),
        }
    }

    /// Number of distinct row addresses the encoding can express
    pub fn row_space(self) -> u16 {
        match self {
            RowEncoding::ParityMasked => 128,
            RowEncoding::Direct => 256,
        }
    }

    /// Parse the configuration name
    pub fn from_config_name(name: &str) -> Option<Self> {
        match name {
            "parity_masked" => Some(RowEncoding::ParityMasked),
            "direct" => Some(RowEncoding::Direct),
            _ => None,
        }
    }
}

/// Parameters of one panel protocol variant
///
/// Read-only for the lifetime of a capture session; changing it is only
/// valid as part of a full bridge reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProtocolDescriptor {
    /// Pixels per line
    pub width: u16,
    /// Lines carrying picture content
    pub active_lines: u16,
    /// Lines per panel frame including blanking
    pub total_lines: u16,
    /// Serial bit rate in baud
    pub baud: u32,
    /// Capture oversampling factor (samples per bit)
    pub oversampling: u8,
    /// Row-address byte encoding
    pub row_encoding: RowEncoding,
}

impl ProtocolDescriptor {
    /// Narrow/fast variant: 256×64 active, 68 total lines, 12.5 Mbaud
    pub const NARROW: Self = Self {
        width: 256,
        active_lines: 64,
        total_lines: 68,
        baud: 12_500_000,
        oversampling: 8,
        row_encoding: RowEncoding::ParityMasked,
    };

    /// Wide/slow variant: 320×80 active, 84 total lines, 20 Mbaud
    pub const WIDE: Self = Self {
        width: 320,
        active_lines: 80,
        total_lines: 84,
        baud: 20_000_000,
        oversampling: 4,
        row_encoding: RowEncoding::Direct,
    };

    /// Built-in descriptor for a variant
    pub const fn builtin(variant: Variant) -> Self {
        match variant {
            Variant::Narrow => Self::NARROW,
            Variant::Wide => Self::WIDE,
        }
    }

    /// Size of one line record on the wire
    #[inline]
    pub fn line_record_size(&self) -> usize {
        self.width as usize + LINE_OVERHEAD
    }

    /// Size of the pixel grid of one frame
    #[inline]
    pub fn frame_pixels(&self) -> usize {
        self.width as usize * self.active_lines as usize
    }

    /// Size of a complete host packet (header + pixels)
    #[inline]
    pub fn packet_size(&self) -> usize {
        crate::packet::FRAME_HEADER_SIZE + self.frame_pixels()
    }

    /// Decode the row-address byte of a line record
    #[inline]
    pub fn decode_row(&self, raw: u8) -> u16 {
        self.row_encoding.decode(raw)
    }

    /// Check that the descriptor fits the fixed-size bridge buffers
    pub fn fits_buffers(&self) -> bool {
        self.width > 0
            && (self.width as usize) <= MAX_PIXEL_WIDTH
            && self.active_lines > 0
            && (self.active_lines as usize) <= MAX_ACTIVE_LINES
            && self.active_lines <= self.total_lines
            && self.total_lines <= self.row_encoding.row_space()
            && self.frame_pixels() <= MAX_FRAME_BYTES
    }
}

impl Default for ProtocolDescriptor {
    fn default() -> Self {
        Self::NARROW
    }
}
