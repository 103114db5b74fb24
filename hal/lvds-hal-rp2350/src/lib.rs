//! RP2350-specific HAL for the LVDS bridge firmware
//!
//! Implements the `lvds-core` capture and output traits on RP2350 hardware:
//!
//! - PIO UART receiver timing (8× and 4× oversampling)
//! - PIO + DMA ring capture (implements `ByteSource` and `CaptureControl`)
//! - USB CDC output channel over a byte pipe (implements `OutputChannel`)

#![no_std]

pub mod capture;
pub mod pio;
pub mod usb;

pub use capture::{CaptureError, PioCapture};
pub use usb::{forward_to_host, TxPipe, UsbChannel};
