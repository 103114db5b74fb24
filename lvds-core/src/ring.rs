//! Consumer side of the capture byte ring
//!
//! The producer cursor belongs to the capture hardware and is only read here.
//! The consumer cursor is owned by the reader and advanced in bounded batches
//! so one long backlog can never starve the rest of the polling loop.

use crate::traits::ByteSource;

/// Ring size exponent used by the capture hardware
pub const RING_BITS: u32 = 15;

/// Ring capacity in bytes
pub const RING_CAPACITY: usize = 1 << RING_BITS;

/// Backlog within this many bytes of capacity counts as an overrun
///
/// Rings smaller than 2 KiB use an eighth of their capacity instead.
pub const OVERRUN_GUARD: usize = 256;

/// Guard band for a ring of `capacity` bytes
pub fn overrun_guard(capacity: usize) -> usize {
    OVERRUN_GUARD.min(capacity / 8)
}

/// Result of one bounded drain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Drain {
    /// Unread bytes observed when the drain started
    pub fill: usize,
    /// Bytes handed to the sink
    pub consumed: usize,
    /// The producer lapped, or nearly lapped, the consumer
    pub overrun: bool,
}

/// Consumer cursor over a [`ByteSource`]
#[derive(Debug, Clone, Default)]
pub struct RingReader {
    consumer: usize,
    /// Unread bytes left behind by the previous drain
    backlog: usize,
}

impl RingReader {
    /// Create a reader positioned at the start of the ring
    pub const fn new() -> Self {
        Self {
            consumer: 0,
            backlog: 0,
        }
    }

    /// Rewind to the start of the ring (capture restarts at zero)
    pub fn reset(&mut self) {
        self.consumer = 0;
        self.backlog = 0;
    }

    /// Current consumer position
    pub fn consumer_position(&self) -> usize {
        self.consumer
    }

    /// Unread bytes between the consumer and the producer
    pub fn available<S: ByteSource>(&self, source: &S) -> usize {
        let mask = source.capacity() - 1;
        source.producer_position().wrapping_sub(self.consumer) & mask
    }

    /// Hand up to `budget` unread bytes, in arrival order, to `sink`
    pub fn drain<S, F>(&mut self, source: &S, budget: usize, mut sink: F) -> Drain
    where
        S: ByteSource,
        F: FnMut(u8),
    {
        let capacity = source.capacity();
        debug_assert!(capacity.is_power_of_two());
        let mask = capacity - 1;

        let producer = source.producer_position() & mask;
        let fill = producer.wrapping_sub(self.consumer) & mask;

        // Without consumption the backlog can only grow; a smaller one means
        // the producer wrapped past the consumer.
        let overrun = fill < self.backlog || fill >= capacity - overrun_guard(capacity);

        let count = fill.min(budget);
        let mut rd = self.consumer;
        for _ in 0..count {
            sink(source.byte_at(rd));
            rd = (rd + 1) & mask;
        }

        self.consumer = rd;
        self.backlog = fill - count;

        Drain {
            fill,
            consumed: count,
            overrun,
        }
    }
}
