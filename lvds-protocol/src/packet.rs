//! Host frame packet header
//!
//! Packet format (all multi-byte fields little-endian):
//! - MAGIC (2 bytes): 0xFE 0xED
//! - FRAME ID (2 bytes): wrapping frame counter
//! - WIDTH (2 bytes): pixels per row
//! - HEIGHT (2 bytes): active rows
//! - PIXELS (width × height bytes): row-major, one byte per pixel

use crate::variant::ProtocolDescriptor;

/// Packet magic bytes
pub const FRAME_MAGIC: [u8; 2] = [0xFE, 0xED];

/// Header size in bytes
pub const FRAME_HEADER_SIZE: usize = 8;

/// Errors that can occur while decoding a packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeaderError {
    /// Fewer than [`FRAME_HEADER_SIZE`] bytes supplied
    Incomplete,
    /// Magic bytes do not match
    BadMagic,
}

/// Frame packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameHeader {
    /// Wrapping frame identifier
    pub frame_id: u16,
    /// Frame width in pixels
    pub width: u16,
    /// Active height in rows
    pub height: u16,
}

impl FrameHeader {
    /// Header for a frame of the given descriptor
    pub fn for_descriptor(frame_id: u16, descriptor: &ProtocolDescriptor) -> Self {
        Self {
            frame_id,
            width: descriptor.width,
            height: descriptor.active_lines,
        }
    }

    /// Number of pixel bytes following the header
    pub fn payload_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Encode into the fixed 8-byte wire form
    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let id = self.frame_id.to_le_bytes();
        let w = self.width.to_le_bytes();
        let h = self.height.to_le_bytes();
        [
            FRAME_MAGIC[0],
            FRAME_MAGIC[1],
            id[0],
            id[1],
            w[0],
            w[1],
            h[0],
            h[1],
        ]
    }

    /// Decode a header from the start of `bytes`
    pub fn decode(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < FRAME_HEADER_SIZE {
            return Err(HeaderError::Incomplete);
        }
        if bytes[..2] != FRAME_MAGIC {
            return Err(HeaderError::BadMagic);
        }

        Ok(Self {
            frame_id: u16::from_le_bytes([bytes[2], bytes[3]]),
            width: u16::from_le_bytes([bytes[4], bytes[5]]),
            height: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }
}
