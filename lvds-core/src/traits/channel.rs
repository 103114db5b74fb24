//! Host output channel trait

/// Flow-controlled, non-blocking byte channel to the host
pub trait OutputChannel {
    /// Bytes the channel can accept right now without blocking
    fn available_capacity(&self) -> usize;

    /// Write up to `bytes.len()` bytes
    ///
    /// Returns the number of bytes accepted, which may be fewer than
    /// requested (including zero). Never blocks.
    fn write(&mut self, bytes: &[u8]) -> usize;

    /// Push buffered bytes towards the host
    fn flush(&mut self);

    /// Whether a host is currently attached
    fn is_connected(&self) -> bool;
}
