//! Hardware abstraction traits
//!
//! These traits define the interface between the bridge logic and the
//! board-specific capture and host-transport implementations.

pub mod capture;
pub mod channel;

pub use capture::{ByteSource, CaptureControl, LineSettings};
pub use channel::OutputChannel;
