//! Bridge controller
//!
//! Owns every piece of bridge state (ring cursor, parser, assembly buffers,
//! sender cursor, counters) and the active protocol descriptor. The firmware
//! drives it from a single cooperative loop:
//!
//! 1. [`BridgeController::poll_capture`] drains a bounded batch of ring bytes
//!    through the parser into the assembler.
//! 2. [`BridgeController::poll_sender`] pushes the pending frame to the host.
//! 3. [`BridgeController::handle_command`] applies host commands between
//!    polling steps. A variant switch is a hard reset of the pipeline.

use lvds_protocol::{HostCommand, ProtocolDescriptor, Variant};

use crate::assembler::{Boundary, FrameAssembler};
use crate::config::{BridgeConfig, ConfigError};
use crate::parser::{LineParser, ParseEvent};
use crate::ring::{RingReader, RING_CAPACITY};
use crate::sender::{FrameSender, SendOutcome, SendReport};
use crate::stats::{StatusSnapshot, Stats};
use crate::traits::{ByteSource, CaptureControl, LineSettings, OutputChannel};

/// Bootloader acknowledgement sent to the host
pub const BOOT_ACK: &[u8] = b"BOOT\n";

/// What one capture poll did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureReport {
    /// Unread bytes when the poll started
    pub fill: usize,
    /// Bytes parsed
    pub consumed: usize,
    /// The producer lapped or nearly lapped the parser
    pub overrun: bool,
    pub lines_valid: u16,
    pub crc_errors: u16,
    pub resyncs: u16,
    pub frames_completed: u16,
    pub frames_dropped: u16,
}

/// Result of a host command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandOutcome {
    /// Keep polling
    Continue,
    /// Capture is halted; drain the queued reply and enter the bootloader
    EnterBootloader,
}

/// Bridge context and mode controller
pub struct BridgeController {
    config: BridgeConfig,
    variant: Variant,
    descriptor: ProtocolDescriptor,
    ring: RingReader,
    parser: LineParser,
    assembler: FrameAssembler,
    sender: FrameSender,
    stats: Stats,
    ring_capacity: usize,
}

impl BridgeController {
    /// Create a controller, rejecting configurations the buffers cannot hold
    pub fn new(config: BridgeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let variant = config.default_variant;
        Ok(Self {
            config,
            variant,
            descriptor: config.descriptor(variant),
            ring: RingReader::new(),
            parser: LineParser::new(config.max_gap_bytes),
            assembler: FrameAssembler::new(),
            sender: FrameSender::new(config.sender_passes),
            stats: Stats::new(),
            ring_capacity: RING_CAPACITY,
        })
    }

    /// Start capture with the power-on variant
    pub fn start<C: CaptureControl>(&mut self, capture: &mut C) -> Result<(), C::Error> {
        capture.halt();
        self.reset_pipeline();
        self.restart_capture(capture)
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn descriptor(&self) -> &ProtocolDescriptor {
        &self.descriptor
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn parser(&self) -> &LineParser {
        &self.parser
    }

    pub fn assembler(&self) -> &FrameAssembler {
        &self.assembler
    }

    pub fn sender(&self) -> &FrameSender {
        &self.sender
    }

    /// Parse up to one budget of captured bytes
    pub fn poll_capture<S: ByteSource>(&mut self, source: &S) -> CaptureReport {
        self.ring_capacity = source.capacity();
        let descriptor = self.descriptor;
        let budget = usize::from(self.config.parse_budget);
        let mut report = CaptureReport::default();

        let Self {
            ring,
            parser,
            assembler,
            stats,
            ..
        } = self;

        let drain = ring.drain(source, budget, |byte| match parser.feed(byte, &descriptor) {
            ParseEvent::None => {}
            ParseEvent::GapByte => stats.gap_bytes = stats.gap_bytes.wrapping_add(1),
            ParseEvent::AlignmentLost => {
                stats.gap_bytes = stats.gap_bytes.wrapping_add(1);
                stats.resyncs = stats.resyncs.wrapping_add(1);
                report.resyncs += 1;
            }
            ParseEvent::RowRejected { .. } => {
                stats.row_rejects = stats.row_rejects.wrapping_add(1);
            }
            ParseEvent::CrcMismatch => {
                stats.crc_errors = stats.crc_errors.wrapping_add(1);
                report.crc_errors += 1;
            }
            ParseEvent::LineValid { row } => {
                stats.crc_ok = stats.crc_ok.wrapping_add(1);
                report.lines_valid += 1;

                let payload = parser.line_payload(&descriptor);
                match assembler.accept_line(row, payload, &descriptor).boundary {
                    Some(Boundary::Handed { .. }) => {
                        stats.frames_sent = stats.frames_sent.wrapping_add(1);
                        report.frames_completed += 1;
                    }
                    Some(Boundary::Dropped { .. }) => {
                        stats.frames_dropped = stats.frames_dropped.wrapping_add(1);
                        report.frames_dropped += 1;
                    }
                    None => {}
                }
            }
        });

        stats.note_fill(drain.fill);
        if drain.overrun {
            stats.overruns = stats.overruns.wrapping_add(1);
        }

        report.fill = drain.fill;
        report.consumed = drain.consumed;
        report.overrun = drain.overrun;
        report
    }

    /// Push pending output to the host without waiting
    pub fn poll_sender<O: OutputChannel>(&mut self, channel: &mut O) -> SendReport {
        let report = self.sender.poll(&mut self.assembler, channel);
        let written = u32::try_from(report.written).unwrap_or(u32::MAX);
        self.stats.bytes_forwarded = self.stats.bytes_forwarded.wrapping_add(written);
        if report.outcome == SendOutcome::Abandoned {
            self.stats.frames_abandoned = self.stats.frames_abandoned.wrapping_add(1);
        }
        report
    }

    /// Whether output is still queued for the host
    pub fn output_pending(&self) -> bool {
        self.sender.reply_pending() || self.assembler.has_pending()
    }

    /// Apply a host command between polling steps
    pub fn handle_command<C: CaptureControl>(
        &mut self,
        command: HostCommand,
        capture: &mut C,
    ) -> Result<CommandOutcome, C::Error> {
        match command {
            HostCommand::SelectVariant(variant) => self.switch_variant(variant, capture)?,
            HostCommand::Status => self.report_status(capture)?,
            HostCommand::ClearStats => self.stats.clear(),
            HostCommand::EnterBootloader => {
                self.prepare_bootloader(capture);
                return Ok(CommandOutcome::EnterBootloader);
            }
        }
        Ok(CommandOutcome::Continue)
    }

    /// Hard reset onto another protocol variant
    pub fn switch_variant<C: CaptureControl>(
        &mut self,
        variant: Variant,
        capture: &mut C,
    ) -> Result<(), C::Error> {
        capture.halt();
        self.reset_pipeline();
        self.variant = variant;
        self.descriptor = self.config.descriptor(variant);
        self.restart_capture(capture)
    }

    /// Queue the status line and resume capture
    pub fn report_status<C: CaptureControl>(&mut self, capture: &mut C) -> Result<(), C::Error> {
        capture.halt();
        self.parser.reset();
        self.assembler.release_pending();
        self.sender.abandon();

        if let Ok(line) = self.status().render() {
            self.sender.queue_reply(line.as_bytes());
        }

        self.restart_capture(capture)
    }

    /// The host opened the port
    pub fn host_attached(&mut self) {
        self.stats.on_host_attached();
    }

    /// Point-in-time status
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            variant: self.variant,
            baud: self.descriptor.baud,
            ring_capacity: self.ring_capacity,
            stats: self.stats,
        }
    }

    fn prepare_bootloader<C: CaptureControl>(&mut self, capture: &mut C) {
        capture.halt();
        self.assembler.release_pending();
        self.sender.abandon();
        self.sender.queue_reply(BOOT_ACK);
    }

    fn reset_pipeline(&mut self) {
        self.parser.reset();
        self.assembler.reset();
        self.sender.abandon();
        self.ring.reset();
    }

    fn restart_capture<C: CaptureControl>(&mut self, capture: &mut C) -> Result<(), C::Error> {
        self.ring.reset();
        self.stats.peak_fill = 0;
        capture.start(LineSettings::from(&self.descriptor))
    }
}
