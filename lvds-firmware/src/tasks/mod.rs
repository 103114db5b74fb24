//! Embassy async tasks
//!
//! The bridge task does all capture, framing and sending. The USB tasks
//! move bytes between the bridge and the host.

pub mod bridge;
pub mod usb;

pub use bridge::bridge_task;
pub use usb::{usb_device_task, usb_rx_task, usb_tx_task};
