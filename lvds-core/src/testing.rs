//! Host-side doubles for the capture and output seams

use core::convert::Infallible;

use lvds_protocol::{crc16_ccitt, ProtocolDescriptor, RowEncoding, SYNC_BYTE};

use crate::traits::{ByteSource, CaptureControl, LineSettings, OutputChannel};

/// In-memory capture ring fed by the test
pub struct SyntheticRing {
    data: Vec<u8>,
    producer: usize,
    pub running: bool,
    pub halts: usize,
    pub starts: Vec<LineSettings>,
}

impl SyntheticRing {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two());
        Self {
            data: vec![0; capacity],
            producer: 0,
            running: true,
            halts: 0,
            starts: Vec::new(),
        }
    }

    /// Append bytes as the capture hardware would
    pub fn push(&mut self, bytes: &[u8]) {
        let mask = self.data.len() - 1;
        for &b in bytes {
            self.data[self.producer] = b;
            self.producer = (self.producer + 1) & mask;
        }
    }
}

impl ByteSource for SyntheticRing {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn producer_position(&self) -> usize {
        self.producer
    }

    fn byte_at(&self, index: usize) -> u8 {
        self.data[index & (self.data.len() - 1)]
    }
}

impl CaptureControl for SyntheticRing {
    type Error = Infallible;

    fn halt(&mut self) {
        self.running = false;
        self.halts += 1;
    }

    fn start(&mut self, settings: LineSettings) -> Result<(), Infallible> {
        self.producer = 0;
        self.data.fill(0);
        self.running = true;
        self.starts.push(settings);
        Ok(())
    }
}

/// Output channel with a per-poll acceptance allowance
pub struct ScriptedChannel {
    pub allowance: usize,
    pub connected: bool,
    pub received: Vec<u8>,
    pub flushes: usize,
}

impl ScriptedChannel {
    /// Connected channel that accepts everything
    pub fn unlimited() -> Self {
        Self {
            allowance: usize::MAX,
            connected: true,
            received: Vec::new(),
            flushes: 0,
        }
    }

    /// Connected channel that accepts `allowance` bytes until granted more
    pub fn limited(allowance: usize) -> Self {
        Self {
            allowance,
            ..Self::unlimited()
        }
    }
}

impl OutputChannel for ScriptedChannel {
    fn available_capacity(&self) -> usize {
        self.allowance
    }

    fn write(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.allowance);
        self.received.extend_from_slice(&bytes[..n]);
        self.allowance -= n;
        n
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Raw row byte for a row address
pub fn row_byte(descriptor: &ProtocolDescriptor, row: u16) -> u8 {
    let row = row as u8;
    match descriptor.row_encoding {
        RowEncoding::ParityMasked => {
            // Odd parity over the full byte
            if row.count_ones() % 2 == 0 {
                row | 0x80
            } else {
                row
            }
        }
        RowEncoding::Direct => row,
    }
}

/// Encode a line record with a correct CRC
pub fn encode_line(descriptor: &ProtocolDescriptor, row: u16, payload: &[u8]) -> Vec<u8> {
    encode_line_with_crc(descriptor, row, payload, crc16_ccitt(payload))
}

/// Encode a line record carrying an arbitrary CRC
pub fn encode_line_with_crc(
    descriptor: &ProtocolDescriptor,
    row: u16,
    payload: &[u8],
    crc: u16,
) -> Vec<u8> {
    assert_eq!(payload.len(), descriptor.width as usize);
    let mut record = Vec::with_capacity(descriptor.line_record_size());
    record.push(SYNC_BYTE);
    record.push(row_byte(descriptor, row));
    record.extend_from_slice(payload);
    record.extend_from_slice(&crc.to_be_bytes());
    record
}

/// Deterministic payload that differs per seed
pub fn pattern_payload(width: usize, seed: u8) -> Vec<u8> {
    (0..width)
        .map(|i| (i as u8).wrapping_mul(7).wrapping_add(seed))
        .collect()
}

/// Encode rows `0..count` of one frame, each row's payload seeded by its row
pub fn encode_rows(descriptor: &ProtocolDescriptor, rows: core::ops::Range<u16>) -> Vec<u8> {
    let width = descriptor.width as usize;
    rows.flat_map(|row| encode_line(descriptor, row, &pattern_payload(width, row as u8)))
        .collect()
}
