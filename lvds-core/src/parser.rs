//! Resynchronizing line-record parser
//!
//! Byte-wise state machine over the captured serial stream. A line record is
//! `[SYNC][row][payload: width][crc_hi][crc_lo]`, where the CRC covers only the
//! payload. Records are separated by gaps of filler bytes whose length is not
//! fixed, so after every record the parser scans for the next sync byte within
//! a bounded budget before it gives up on alignment.
//!
//! Once a record passes its CRC the stream is considered aligned ("locked")
//! and the parser trusts record boundaries. While unlocked, a sync byte that
//! turns out to have an impossible row address is treated as a false sync.

use lvds_protocol::{crc16_ccitt, ProtocolDescriptor, MAX_LINE_RECORD_SIZE, SYNC_BYTE};

/// Default gap budget between aligned records
pub const DEFAULT_MAX_GAP_BYTES: u16 = 64;

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseState {
    /// Looking for a sync byte with no alignment
    ScanningForSync,
    /// Collecting a line record
    ReadingLine,
    /// Skipping inter-line filler, budget-limited
    ScanningGap,
}

/// What a single byte did to the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseEvent {
    /// Nothing to report
    None,
    /// A filler byte was skipped between records
    GapByte,
    /// The gap budget ran out; alignment is lost
    AlignmentLost,
    /// The row address is outside the panel frame
    RowRejected { row: u16 },
    /// A complete record passed its CRC; payload available until the next byte
    LineValid { row: u16 },
    /// A complete record failed its CRC
    CrcMismatch,
}

/// Line parser state machine
#[derive(Debug, Clone)]
pub struct LineParser {
    state: ParseState,
    line: [u8; MAX_LINE_RECORD_SIZE],
    line_pos: usize,
    gap_budget: usize,
    locked: bool,
    max_gap: usize,
}

impl LineParser {
    /// Create a parser with the given nominal gap budget
    pub const fn new(max_gap_bytes: u16) -> Self {
        Self {
            state: ParseState::ScanningForSync,
            line: [0; MAX_LINE_RECORD_SIZE],
            line_pos: 0,
            gap_budget: 0,
            locked: false,
            max_gap: max_gap_bytes as usize,
        }
    }

    /// Forget any partial record and alignment
    pub fn reset(&mut self) {
        self.state = ParseState::ScanningForSync;
        self.line_pos = 0;
        self.gap_budget = 0;
        self.locked = false;
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Whether a record has passed CRC since alignment was last lost
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Remaining filler bytes allowed before alignment is abandoned
    pub fn gap_budget(&self) -> usize {
        self.gap_budget
    }

    /// Payload of the most recently completed record
    pub fn line_payload(&self, descriptor: &ProtocolDescriptor) -> &[u8] {
        &self.line[2..2 + descriptor.width as usize]
    }

    /// Feed one byte
    pub fn feed(&mut self, byte: u8, descriptor: &ProtocolDescriptor) -> ParseEvent {
        match self.state {
            ParseState::ScanningForSync => {
                if byte == SYNC_BYTE {
                    self.begin_line();
                    self.locked = false;
                }
                ParseEvent::None
            }
            ParseState::ScanningGap => {
                if byte == SYNC_BYTE {
                    self.begin_line();
                    return ParseEvent::None;
                }
                self.gap_budget = self.gap_budget.saturating_sub(1);
                if self.gap_budget == 0 {
                    self.state = ParseState::ScanningForSync;
                    self.locked = false;
                    ParseEvent::AlignmentLost
                } else {
                    ParseEvent::GapByte
                }
            }
            ParseState::ReadingLine => self.read_line_byte(byte, descriptor),
        }
    }

    fn begin_line(&mut self) {
        self.line[0] = SYNC_BYTE;
        self.line_pos = 1;
        self.state = ParseState::ReadingLine;
    }

    fn read_line_byte(&mut self, byte: u8, descriptor: &ProtocolDescriptor) -> ParseEvent {
        self.line[self.line_pos] = byte;
        self.line_pos += 1;

        if self.line_pos == 2 {
            let row = descriptor.decode_row(byte);
            if row >= descriptor.total_lines {
                return self.reject_row(row, byte, descriptor);
            }
            return ParseEvent::None;
        }

        let record_size = descriptor.line_record_size();
        if self.line_pos < record_size {
            return ParseEvent::None;
        }

        self.line_pos = 0;
        self.state = ParseState::ScanningGap;

        let width = descriptor.width as usize;
        let expected = u16::from_be_bytes([self.line[record_size - 2], self.line[record_size - 1]]);
        if crc16_ccitt(&self.line[2..2 + width]) == expected {
            self.locked = true;
            self.gap_budget = self.max_gap;
            ParseEvent::LineValid {
                row: descriptor.decode_row(self.line[1]),
            }
        } else {
            // Allow a full record of slack to find the next boundary
            self.gap_budget = self.max_gap + record_size;
            ParseEvent::CrcMismatch
        }
    }

    fn reject_row(&mut self, row: u16, byte: u8, descriptor: &ProtocolDescriptor) -> ParseEvent {
        self.line_pos = 0;
        if self.locked {
            self.gap_budget = self.max_gap + descriptor.line_record_size();
            self.state = ParseState::ScanningGap;
        } else if byte == SYNC_BYTE {
            // The row byte may itself be the real sync
            self.begin_line();
        } else {
            self.state = ParseState::ScanningForSync;
        }
        ParseEvent::RowRejected { row }
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_GAP_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{encode_line, encode_line_with_crc, pattern_payload};
    use proptest::prelude::*;

    const NARROW: ProtocolDescriptor = ProtocolDescriptor::NARROW;
    const WIDE: ProtocolDescriptor = ProtocolDescriptor::WIDE;

    fn feed_all(parser: &mut LineParser, bytes: &[u8], d: &ProtocolDescriptor) -> Vec<ParseEvent> {
        bytes
            .iter()
            .map(|&b| parser.feed(b, d))
            .filter(|e| *e != ParseEvent::None)
            .collect()
    }

    #[test]
    fn test_valid_line_locks() {
        let mut parser = LineParser::default();
        let payload = pattern_payload(256, 3);
        let events = feed_all(&mut parser, &encode_line(&NARROW, 5, &payload), &NARROW);

        assert_eq!(events, [ParseEvent::LineValid { row: 5 }]);
        assert!(parser.is_locked());
        assert_eq!(parser.state(), ParseState::ScanningGap);
        assert_eq!(parser.gap_budget(), DEFAULT_MAX_GAP_BYTES as usize);
        assert_eq!(parser.line_payload(&NARROW), &payload[..]);
    }

    #[test]
    fn test_parity_bit_ignored_on_narrow() {
        let mut parser = LineParser::default();
        let mut record = encode_line(&NARROW, 0, &pattern_payload(256, 0));
        assert_eq!(record[1], 0x80);

        let events = feed_all(&mut parser, &record, &NARROW);
        assert_eq!(events, [ParseEvent::LineValid { row: 0 }]);

        // Same row without the parity bit is still row 0
        record[1] = 0x00;
        let events = feed_all(&mut parser, &record, &NARROW);
        assert_eq!(events, [ParseEvent::LineValid { row: 0 }]);
    }

    #[test]
    fn test_crc_mismatch_extends_gap_budget() {
        let mut parser = LineParser::default();
        let record = encode_line_with_crc(&NARROW, 3, &pattern_payload(256, 1), 0xDEAD);

        let events = feed_all(&mut parser, &record, &NARROW);
        assert_eq!(events, [ParseEvent::CrcMismatch]);
        assert!(!parser.is_locked());
        assert_eq!(
            parser.gap_budget(),
            DEFAULT_MAX_GAP_BYTES as usize + NARROW.line_record_size()
        );
    }

    #[test]
    fn test_gap_bytes_then_next_line() {
        let mut parser = LineParser::default();
        let mut stream = encode_line(&WIDE, 1, &pattern_payload(320, 1));
        stream.extend_from_slice(&[0x00; 10]);
        stream.extend(encode_line(&WIDE, 2, &pattern_payload(320, 2)));

        let events = feed_all(&mut parser, &stream, &WIDE);
        assert_eq!(events.len(), 12);
        assert_eq!(events[0], ParseEvent::LineValid { row: 1 });
        assert!(events[1..11].iter().all(|e| *e == ParseEvent::GapByte));
        assert_eq!(events[11], ParseEvent::LineValid { row: 2 });
    }

    #[test]
    fn test_gap_budget_exhaustion_loses_alignment() {
        let mut parser = LineParser::new(4);
        let mut stream = encode_line(&WIDE, 1, &pattern_payload(320, 1));
        stream.extend_from_slice(&[0x11; 4]);

        let events = feed_all(&mut parser, &stream, &WIDE);
        assert_eq!(events.last(), Some(&ParseEvent::AlignmentLost));
        assert_eq!(parser.state(), ParseState::ScanningForSync);
        assert!(!parser.is_locked());
    }

    #[test]
    fn test_bad_row_while_locked_skips_record() {
        let mut parser = LineParser::default();
        feed_all(&mut parser, &encode_line(&NARROW, 1, &pattern_payload(256, 0)), &NARROW);

        // Raw 0xC5 decodes to row 69, beyond the 68-line frame
        assert_eq!(parser.feed(SYNC_BYTE, &NARROW), ParseEvent::None);
        assert_eq!(parser.feed(0xC5, &NARROW), ParseEvent::RowRejected { row: 69 });
        assert_eq!(parser.state(), ParseState::ScanningGap);
        assert_eq!(
            parser.gap_budget(),
            DEFAULT_MAX_GAP_BYTES as usize + NARROW.line_record_size()
        );
    }

    #[test]
    fn test_false_sync_while_unlocked() {
        let mut parser = LineParser::default();

        // Row byte is itself a sync: restart the candidate there
        parser.feed(SYNC_BYTE, &WIDE);
        assert_eq!(parser.feed(SYNC_BYTE, &WIDE), ParseEvent::RowRejected { row: 93 });
        assert_eq!(parser.state(), ParseState::ReadingLine);

        // Any other bad row goes back to scanning
        assert_eq!(parser.feed(0xF0, &WIDE), ParseEvent::RowRejected { row: 0xF0 });
        assert_eq!(parser.state(), ParseState::ScanningForSync);
    }

    #[test]
    fn test_sync_inside_payload_is_data() {
        let mut parser = LineParser::default();
        let payload = [SYNC_BYTE; 256];
        let events = feed_all(&mut parser, &encode_line(&NARROW, 7, &payload), &NARROW);
        assert_eq!(events, [ParseEvent::LineValid { row: 7 }]);
    }

    #[test]
    fn test_reset_discards_partial_line() {
        let mut parser = LineParser::default();
        let record = encode_line(&NARROW, 2, &pattern_payload(256, 9));
        feed_all(&mut parser, &record[..100], &NARROW);
        assert_eq!(parser.state(), ParseState::ReadingLine);

        parser.reset();
        assert_eq!(parser.state(), ParseState::ScanningForSync);
        assert!(feed_all(&mut parser, &record[100..], &NARROW)
            .iter()
            .all(|e| !matches!(e, ParseEvent::LineValid { .. })));
    }

    proptest! {
        #[test]
        fn test_noise_never_yields_false_line(noise in proptest::collection::vec(any::<u8>(), 0..2048)) {
            // Noise with no embedded record: any accepted line must carry a valid CRC
            let mut parser = LineParser::default();
            for b in noise {
                if let ParseEvent::LineValid { row } = parser.feed(b, &WIDE) {
                    prop_assert!(row < WIDE.total_lines);
                    let payload = parser.line_payload(&WIDE).to_vec();
                    prop_assert_eq!(payload.len(), 320);
                }
            }
        }

        #[test]
        fn test_relocks_after_noise(
            noise in proptest::collection::vec(any::<u8>().prop_filter("no sync", |b| *b != SYNC_BYTE), 0..600),
            row in 0u16..64,
            seed in any::<u8>(),
        ) {
            let mut parser = LineParser::default();
            let payload = pattern_payload(256, seed);
            let mut stream = noise;
            stream.extend(encode_line(&NARROW, row, &payload));

            let valid: Vec<_> = feed_all(&mut parser, &stream, &NARROW)
                .into_iter()
                .filter(|e| matches!(e, ParseEvent::LineValid { .. }))
                .collect();
            prop_assert_eq!(valid, vec![ParseEvent::LineValid { row }]);
            prop_assert_eq!(parser.line_payload(&NARROW), &payload[..]);
        }
    }
}
