//! Double-buffered frame assembly
//!
//! Validated lines are written into the active buffer at their row. A row
//! address that does not increase marks the start of the next panel frame:
//! the active buffer is handed to the sender if the send slot is free, or the
//! frame is dropped if the previous one is still being drained. Capture never
//! waits on the host.

use lvds_protocol::{FrameHeader, ProtocolDescriptor, MAX_ACTIVE_LINES, MAX_FRAME_BYTES};

/// Ownership role of an assembly buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferRole {
    /// Receiving lines
    Active,
    /// Owned by the sender until drained or abandoned
    PendingSend,
    /// Free, becomes active at the next frame boundary
    Idle,
}

/// Frame boundary outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Boundary {
    /// The completed frame was handed to the sender
    Handed { frame_id: u16 },
    /// The send slot was busy; the completed frame was discarded
    Dropped { frame_id: u16 },
}

/// Result of placing one validated line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Placement {
    /// Boundary detected before the line was placed
    pub boundary: Option<Boundary>,
    /// Whether the line landed in the pixel grid (blanking rows do not)
    pub placed: bool,
}

/// A completed frame awaiting transmission
#[derive(Debug, Clone, Copy)]
pub struct PendingFrame<'a> {
    pub header: FrameHeader,
    pub pixels: &'a [u8],
}

#[derive(Debug, Clone)]
struct AssemblyBuffer {
    pixels: [u8; MAX_FRAME_BYTES],
    placed: [bool; MAX_ACTIVE_LINES],
    placed_count: u16,
    header: FrameHeader,
    role: BufferRole,
}

impl AssemblyBuffer {
    const fn new(role: BufferRole) -> Self {
        Self {
            pixels: [0; MAX_FRAME_BYTES],
            placed: [false; MAX_ACTIVE_LINES],
            placed_count: 0,
            header: FrameHeader {
                frame_id: 0,
                width: 0,
                height: 0,
            },
            role,
        }
    }

    /// Zero the pixel grid and forget placed rows
    fn clear(&mut self, frame_pixels: usize) {
        self.pixels[..frame_pixels].fill(0);
        self.placed = [false; MAX_ACTIVE_LINES];
        self.placed_count = 0;
    }
}

/// Two assembly buffers, one accumulating and one available to the sender
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    buffers: [AssemblyBuffer; 2],
    prev_row: Option<u16>,
    frame_id: u16,
}

impl FrameAssembler {
    pub const fn new() -> Self {
        Self {
            buffers: [
                AssemblyBuffer::new(BufferRole::Active),
                AssemblyBuffer::new(BufferRole::Idle),
            ],
            prev_row: None,
            frame_id: 0,
        }
    }

    /// Zero both buffers and return them to their initial roles
    ///
    /// The frame id keeps counting so the host sees gaps, not a restart.
    pub fn reset(&mut self) {
        for (buffer, role) in self.buffers.iter_mut().zip([BufferRole::Active, BufferRole::Idle]) {
            buffer.clear(MAX_FRAME_BYTES);
            buffer.role = role;
        }
        self.prev_row = None;
    }

    /// Place a validated line, detecting a frame boundary first
    pub fn accept_line(&mut self, row: u16, payload: &[u8], descriptor: &ProtocolDescriptor) -> Placement {
        let boundary = match self.prev_row {
            Some(prev) if row <= prev && self.active().placed_count > 0 => {
                Some(self.complete_frame(descriptor))
            }
            _ => None,
        };
        self.prev_row = Some(row);

        if row >= descriptor.active_lines {
            return Placement {
                boundary,
                placed: false,
            };
        }

        let width = descriptor.width as usize;
        let start = row as usize * width;
        let active = self.active_mut();
        active.pixels[start..start + width].copy_from_slice(&payload[..width]);
        if !active.placed[row as usize] {
            active.placed[row as usize] = true;
            active.placed_count += 1;
        }

        Placement {
            boundary,
            placed: true,
        }
    }

    fn complete_frame(&mut self, descriptor: &ProtocolDescriptor) -> Boundary {
        self.frame_id = self.frame_id.wrapping_add(1);
        let frame_id = self.frame_id;
        let frame_pixels = descriptor.frame_pixels();
        let active = self.active_index();

        if self.has_pending() {
            self.buffers[active].clear(frame_pixels);
            return Boundary::Dropped { frame_id };
        }

        let completed = &mut self.buffers[active];
        completed.header = FrameHeader::for_descriptor(frame_id, descriptor);
        completed.role = BufferRole::PendingSend;

        let next = &mut self.buffers[1 - active];
        next.role = BufferRole::Active;
        next.clear(frame_pixels);

        Boundary::Handed { frame_id }
    }

    /// Frame currently owned by the sender
    pub fn pending_frame(&self) -> Option<PendingFrame<'_>> {
        self.buffers
            .iter()
            .find(|b| b.role == BufferRole::PendingSend)
            .map(|b| PendingFrame {
                header: b.header,
                pixels: &b.pixels[..b.header.payload_len()],
            })
    }

    /// Return the sender's buffer to the idle pool
    ///
    /// Returns `false` if no frame was pending.
    pub fn release_pending(&mut self) -> bool {
        match self.buffers.iter_mut().find(|b| b.role == BufferRole::PendingSend) {
            Some(buffer) => {
                buffer.role = BufferRole::Idle;
                true
            }
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.buffers.iter().any(|b| b.role == BufferRole::PendingSend)
    }

    pub fn roles(&self) -> [BufferRole; 2] {
        [self.buffers[0].role, self.buffers[1].role]
    }

    /// Frame id stamped on the most recent completed frame
    pub fn frame_id(&self) -> u16 {
        self.frame_id
    }

    /// Rows placed into the active frame so far
    pub fn placed_rows(&self) -> u16 {
        self.active().placed_count
    }

    /// Pixel row of the active frame
    pub fn active_row(&self, row: u16, descriptor: &ProtocolDescriptor) -> &[u8] {
        let width = descriptor.width as usize;
        let start = row as usize * width;
        &self.active().pixels[start..start + width]
    }

    fn active_index(&self) -> usize {
        if self.buffers[0].role == BufferRole::Active {
            0
        } else {
            1
        }
    }

    fn active(&self) -> &AssemblyBuffer {
        &self.buffers[self.active_index()]
    }

    fn active_mut(&mut self) -> &mut AssemblyBuffer {
        let index = self.active_index();
        &mut self.buffers[index]
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::pattern_payload;

    const NARROW: ProtocolDescriptor = ProtocolDescriptor::NARROW;

    fn boxed() -> Box<FrameAssembler> {
        Box::new(FrameAssembler::new())
    }

    fn place_rows(assembler: &mut FrameAssembler, rows: core::ops::Range<u16>) -> Vec<Placement> {
        rows.map(|row| assembler.accept_line(row, &pattern_payload(256, row as u8), &NARROW))
            .collect()
    }

    fn exactly_one_active(assembler: &FrameAssembler) -> bool {
        assembler.roles().iter().filter(|r| **r == BufferRole::Active).count() == 1
    }

    #[test]
    fn test_rows_land_at_their_offset() {
        let mut assembler = boxed();
        let payload = pattern_payload(256, 42);
        let placement = assembler.accept_line(10, &payload, &NARROW);

        assert_eq!(
            placement,
            Placement {
                boundary: None,
                placed: true
            }
        );
        assert_eq!(assembler.active_row(10, &NARROW), &payload[..]);
        assert_eq!(assembler.placed_rows(), 1);
    }

    #[test]
    fn test_blanking_rows_not_placed() {
        let mut assembler = boxed();
        let placement = assembler.accept_line(65, &pattern_payload(256, 1), &NARROW);
        assert!(!placement.placed);
        assert_eq!(assembler.placed_rows(), 0);
    }

    #[test]
    fn test_boundary_hands_off_first_frame() {
        let mut assembler = boxed();
        place_rows(&mut assembler, 0..64);
        let placement = assembler.accept_line(0, &pattern_payload(256, 0), &NARROW);

        assert_eq!(placement.boundary, Some(Boundary::Handed { frame_id: 1 }));
        assert!(assembler.has_pending());
        assert!(exactly_one_active(&assembler));

        let frame = assembler.pending_frame().unwrap();
        assert_eq!(frame.header.frame_id, 1);
        assert_eq!(frame.header.width, 256);
        assert_eq!(frame.header.height, 64);
        assert_eq!(frame.pixels.len(), 256 * 64);
        assert_eq!(&frame.pixels[256 * 63..], &pattern_payload(256, 63)[..]);
    }

    #[test]
    fn test_busy_slot_drops_frame() {
        let mut assembler = boxed();
        place_rows(&mut assembler, 0..64);
        place_rows(&mut assembler, 0..64);
        let placement = assembler.accept_line(0, &pattern_payload(256, 0), &NARROW);

        assert_eq!(placement.boundary, Some(Boundary::Dropped { frame_id: 2 }));
        // The sender still owns frame 1
        assert_eq!(assembler.pending_frame().unwrap().header.frame_id, 1);
        assert!(exactly_one_active(&assembler));
    }

    #[test]
    fn test_new_frame_starts_zeroed() {
        let mut assembler = boxed();
        place_rows(&mut assembler, 0..64);
        assembler.accept_line(0, &pattern_payload(256, 0), &NARROW);

        // Row 5 was not received in the new frame
        assert!(assembler.active_row(5, &NARROW).iter().all(|&b| b == 0));
        assert_eq!(assembler.placed_rows(), 1);
    }

    #[test]
    fn test_dropped_frame_does_not_leak_rows() {
        let mut assembler = boxed();
        place_rows(&mut assembler, 0..64);
        place_rows(&mut assembler, 0..64);
        assembler.accept_line(3, &pattern_payload(256, 3), &NARROW);
        assembler.accept_line(0, &pattern_payload(256, 9), &NARROW);

        assert!(assembler.active_row(40, &NARROW).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_repeated_row_is_boundary() {
        let mut assembler = boxed();
        assembler.accept_line(7, &pattern_payload(256, 1), &NARROW);
        let placement = assembler.accept_line(7, &pattern_payload(256, 2), &NARROW);
        assert_eq!(placement.boundary, Some(Boundary::Handed { frame_id: 1 }));
    }

    #[test]
    fn test_no_boundary_without_placed_rows() {
        let mut assembler = boxed();
        // Blanking only: nothing placed, so no frame to complete
        assembler.accept_line(66, &pattern_payload(256, 0), &NARROW);
        let placement = assembler.accept_line(65, &pattern_payload(256, 0), &NARROW);
        assert_eq!(placement.boundary, None);
    }

    #[test]
    fn test_release_and_reset() {
        let mut assembler = boxed();
        place_rows(&mut assembler, 0..4);
        assembler.accept_line(0, &pattern_payload(256, 0), &NARROW);

        assert!(assembler.release_pending());
        assert!(!assembler.release_pending());
        assert!(!assembler.has_pending());

        assembler.reset();
        assert_eq!(assembler.roles(), [BufferRole::Active, BufferRole::Idle]);
        assert_eq!(assembler.frame_id(), 1);
        assert_eq!(assembler.placed_rows(), 0);

        place_rows(&mut assembler, 0..4);
        let placement = assembler.accept_line(0, &pattern_payload(256, 0), &NARROW);
        assert_eq!(placement.boundary, Some(Boundary::Handed { frame_id: 2 }));
    }

    #[test]
    fn test_frame_id_wraps() {
        let mut assembler = boxed();
        assembler.frame_id = u16::MAX;
        assembler.accept_line(1, &pattern_payload(256, 0), &NARROW);
        let placement = assembler.accept_line(0, &pattern_payload(256, 0), &NARROW);
        assert_eq!(placement.boundary, Some(Boundary::Handed { frame_id: 0 }));
    }
}
