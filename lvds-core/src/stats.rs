//! Bridge counters and the host status line

use core::fmt::{self, Write};

use heapless::String;
use lvds_protocol::Variant;

/// Capacity of a rendered status line
pub const STATUS_LINE_CAPACITY: usize = 224;

/// Cumulative bridge counters
///
/// All counters wrap on overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    /// Bytes accepted by the host channel
    pub bytes_forwarded: u32,
    /// Frames handed to the sender
    pub frames_sent: u32,
    /// Frames discarded because the send slot was busy
    pub frames_dropped: u32,
    /// Frames released unsent because the host disconnected
    pub frames_abandoned: u32,
    /// Lines that passed CRC
    pub crc_ok: u32,
    /// Complete lines that failed CRC
    pub crc_errors: u32,
    /// Filler bytes skipped between lines
    pub gap_bytes: u32,
    /// Times the gap budget ran out and alignment was lost
    pub resyncs: u32,
    /// Records abandoned for an out-of-range row address
    pub row_rejects: u32,
    /// Largest ring backlog seen since capture (re)started
    pub peak_fill: u32,
    /// Polls where the producer lapped or nearly lapped the consumer
    pub overruns: u32,
}

impl Stats {
    pub const fn new() -> Self {
        Self {
            bytes_forwarded: 0,
            frames_sent: 0,
            frames_dropped: 0,
            frames_abandoned: 0,
            crc_ok: 0,
            crc_errors: 0,
            gap_bytes: 0,
            resyncs: 0,
            row_rejects: 0,
            peak_fill: 0,
            overruns: 0,
        }
    }

    /// Zero every counter
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// A host session starts: traffic counters restart from zero
    pub fn on_host_attached(&mut self) {
        self.bytes_forwarded = 0;
        self.frames_sent = 0;
        self.frames_dropped = 0;
    }

    pub(crate) fn note_fill(&mut self, fill: usize) {
        let fill = u32::try_from(fill).unwrap_or(u32::MAX);
        if fill > self.peak_fill {
            self.peak_fill = fill;
        }
    }
}

/// Point-in-time view used to render the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub variant: Variant,
    pub baud: u32,
    pub ring_capacity: usize,
    pub stats: Stats,
}

impl StatusSnapshot {
    /// Render as a single `\n`-terminated line of `KEY=value` fields
    pub fn render(&self) -> Result<String<STATUS_LINE_CAPACITY>, fmt::Error> {
        let mut line = String::new();
        write!(line, "{self}")?;
        Ok(line)
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        writeln!(
            f,
            "MODE={} BAUD={} USB={} SENT={} DROP={} CRC_OK={} CRC_ERR={} GAP={} RESYNC={} MAXFILL={}/{} OVERRUN={}",
            self.variant.name(),
            self.baud,
            s.bytes_forwarded,
            s.frames_sent,
            s.frames_dropped,
            s.crc_ok,
            s.crc_errors,
            s.gap_bytes,
            s.resyncs,
            s.peak_fill,
            self.ring_capacity,
            s.overruns,
        )
    }
}
