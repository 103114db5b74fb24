//! Non-blocking frame sender
//!
//! Drains the pending frame to the host channel in whatever chunks the channel
//! will accept right now, resuming from a cursor on the next poll. Short
//! control replies (status line, bootloader ack) go out ahead of frame data.

use heapless::Vec;
use lvds_protocol::FRAME_HEADER_SIZE;

use crate::assembler::FrameAssembler;
use crate::traits::OutputChannel;

/// Default number of chunk writes attempted per poll
pub const DEFAULT_SENDER_PASSES: u8 = 4;

/// Largest control reply the sender will queue
pub const REPLY_CAPACITY: usize = crate::stats::STATUS_LINE_CAPACITY;

/// Outcome of one sender poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendOutcome {
    /// No frame pending
    Idle,
    /// Frame partially sent; resumes on the next poll
    InProgress,
    /// Last byte of the frame was accepted; slot released
    Completed,
    /// Host went away; frame abandoned and slot released
    Abandoned,
}

/// Bytes written and frame progress for one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SendReport {
    pub written: usize,
    pub outcome: SendOutcome,
}

/// Resumable sender state
#[derive(Debug, Clone)]
pub struct FrameSender {
    /// Offset into header + pixels of the pending frame
    cursor: usize,
    reply: Vec<u8, REPLY_CAPACITY>,
    reply_cursor: usize,
    passes: u8,
}

impl FrameSender {
    pub const fn new(passes: u8) -> Self {
        Self {
            cursor: 0,
            reply: Vec::new(),
            reply_cursor: 0,
            passes,
        }
    }

    /// Bytes of the pending frame already accepted by the channel
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether a control reply is still waiting to go out
    pub fn reply_pending(&self) -> bool {
        self.reply_cursor < self.reply.len()
    }

    /// Queue a control reply ahead of frame data
    ///
    /// Replaces any reply that has not been fully sent. Returns `false` if the
    /// reply does not fit.
    pub fn queue_reply(&mut self, bytes: &[u8]) -> bool {
        self.reply.clear();
        self.reply_cursor = 0;
        self.reply.extend_from_slice(bytes).is_ok()
    }

    /// Forget the in-flight frame; the caller releases the slot
    pub fn abandon(&mut self) {
        self.cursor = 0;
    }

    /// Forget the in-flight frame and any queued reply
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.reply.clear();
        self.reply_cursor = 0;
    }

    /// Push as much as the channel accepts without waiting
    pub fn poll<O: OutputChannel>(&mut self, frames: &mut FrameAssembler, channel: &mut O) -> SendReport {
        let connected = channel.is_connected();
        let mut written = 0;

        if self.reply_pending() {
            if connected {
                written += self.send_reply(channel);
            } else {
                self.reply.clear();
                self.reply_cursor = 0;
            }
        }

        let outcome = if self.reply_pending() {
            if frames.has_pending() {
                SendOutcome::InProgress
            } else {
                SendOutcome::Idle
            }
        } else {
            self.send_frame(frames, channel, connected, &mut written)
        };

        if written > 0 {
            channel.flush();
        }

        SendReport { written, outcome }
    }

    fn send_reply<O: OutputChannel>(&mut self, channel: &mut O) -> usize {
        let remaining = &self.reply[self.reply_cursor..];
        let room = channel.available_capacity().min(remaining.len());
        if room == 0 {
            return 0;
        }
        let n = channel.write(&remaining[..room]);
        self.reply_cursor += n;
        if !self.reply_pending() {
            self.reply.clear();
            self.reply_cursor = 0;
        }
        n
    }

    fn send_frame<O: OutputChannel>(
        &mut self,
        frames: &mut FrameAssembler,
        channel: &mut O,
        connected: bool,
        written: &mut usize,
    ) -> SendOutcome {
        if !frames.has_pending() {
            return SendOutcome::Idle;
        }
        if !connected {
            frames.release_pending();
            self.cursor = 0;
            return SendOutcome::Abandoned;
        }

        let complete = match frames.pending_frame() {
            Some(frame) => {
                let header = frame.header.encode();
                let total = FRAME_HEADER_SIZE + frame.pixels.len();

                for _ in 0..self.passes {
                    let room = channel.available_capacity();
                    if room == 0 || self.cursor >= total {
                        break;
                    }
                    let chunk = if self.cursor < FRAME_HEADER_SIZE {
                        &header[self.cursor..]
                    } else {
                        &frame.pixels[self.cursor - FRAME_HEADER_SIZE..]
                    };
                    let n = channel.write(&chunk[..room.min(chunk.len())]);
                    self.cursor += n;
                    *written += n;
                    if n == 0 {
                        break;
                    }
                }

                self.cursor >= total
            }
            None => false,
        };

        if complete {
            frames.release_pending();
            self.cursor = 0;
            SendOutcome::Completed
        } else {
            SendOutcome::InProgress
        }
    }
}

impl Default for FrameSender {
    fn default() -> Self {
        Self::new(DEFAULT_SENDER_PASSES)
    }
}
