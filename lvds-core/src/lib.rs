//! Board-agnostic core logic for the LVDS bridge firmware
//!
//! This crate turns the panel's unbounded, occasionally corrupted serial byte
//! stream into CRC-validated frames and drains them to a slow host channel:
//!
//! - Hardware abstraction traits (byte source, capture control, output channel)
//! - Byte ring reader with bounded consumption and overrun accounting
//! - Resynchronizing line parser state machine
//! - Double-buffered frame assembler with drop-on-busy handoff
//! - Non-blocking, resumable frame sender
//! - Mode controller, statistics and host command handling
//! - Configuration types and parser

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod assembler;
pub mod config;
pub mod controller;
pub mod indicator;
pub mod parser;
pub mod ring;
pub mod sender;
pub mod stats;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{BridgeController, CaptureReport, CommandOutcome};
