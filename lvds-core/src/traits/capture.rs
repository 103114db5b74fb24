//! Capture-side traits
//!
//! The capture hardware writes received bytes into a power-of-two ring at
//! line rate, independently of the software loop. Software only ever reads
//! the producer position; it never signals back to the producer.

use lvds_protocol::ProtocolDescriptor;

/// Read-only view of the hardware-filled byte ring
pub trait ByteSource {
    /// Ring capacity in bytes (a power of two)
    fn capacity(&self) -> usize;

    /// Index the producer will write next, in `0..capacity()`
    fn producer_position(&self) -> usize;

    /// Byte stored at `index` (`index < capacity()`)
    fn byte_at(&self, index: usize) -> u8;
}

/// Serial line settings for the capture front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineSettings {
    /// Bit rate in baud
    pub baud: u32,
    /// Samples taken per bit
    pub oversampling: u8,
}

impl From<&ProtocolDescriptor> for LineSettings {
    fn from(descriptor: &ProtocolDescriptor) -> Self {
        Self {
            baud: descriptor.baud,
            oversampling: descriptor.oversampling,
        }
    }
}

/// Start/stop control over the capture front-end
pub trait CaptureControl {
    /// Error type for starting capture
    type Error;

    /// Halt byte capture
    ///
    /// After this returns the producer position no longer advances.
    fn halt(&mut self);

    /// (Re)start byte capture with the given line settings
    ///
    /// The producer position restarts at zero.
    fn start(&mut self, settings: LineSettings) -> Result<(), Self::Error>;
}
