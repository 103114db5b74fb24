//! LVDS panel line protocol and host frame packet format
//!
//! This crate defines the two wire formats the bridge sits between:
//!
//! - The **line protocol** emitted by the panel's serial output. Every scan
//!   line is a fixed-size record:
//!
//! ```text
//! ┌──────┬─────┬─────────────────────────┬──────────┐
//! │ SYNC │ ROW │ PIXELS                  │ CRC16 BE │
//! │ 0x5D │ 1B  │ width bytes             │ 2B       │
//! └──────┴─────┴─────────────────────────┴──────────┘
//! ```
//!
//! - The **frame packet** sent to the host over USB: an 8-byte little-endian
//!   header followed by `width × active_height` grayscale pixels.
//!
//! The host drives the bridge with single-byte commands ([`HostCommand`]).

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod crc;
pub mod packet;
pub mod variant;

pub use command::HostCommand;
pub use crc::crc16_ccitt;
pub use packet::{FrameHeader, HeaderError, FRAME_HEADER_SIZE, FRAME_MAGIC};
pub use variant::{
    ProtocolDescriptor, RowEncoding, Variant, LINE_OVERHEAD, MAX_ACTIVE_LINES, MAX_FRAME_BYTES,
    MAX_LINE_RECORD_SIZE, MAX_PIXEL_WIDTH, SYNC_BYTE,
};
