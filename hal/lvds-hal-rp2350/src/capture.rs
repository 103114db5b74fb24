//! PIO + DMA ring capture
//!
//! PIO0 state machine 0 runs an oversampling UART receiver on the capture
//! pin and pushes each byte into the top byte of its RX FIFO word. A DMA
//! channel paced by the FIFO copies that byte into a 32 KiB ring with the
//! address-wrap feature, so the producer never stops and never waits for
//! software. The producer cursor is the channel's write address relative to
//! the ring base.

use core::cell::UnsafeCell;
use core::sync::atomic::{compiler_fence, Ordering};

use embassy_rp::dma::Channel;
use embassy_rp::pac;
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::{
    Common, Config, Direction as PioDirection, FifoJoin, LoadedProgram, Pin, PioPin, ShiftConfig,
    ShiftDirection, StateMachine,
};
use embassy_rp::Peri;
use fixed::types::U24F8;

use lvds_core::ring::{RING_BITS, RING_CAPACITY};
use lvds_core::traits::{ByteSource, CaptureControl, LineSettings};

use crate::pio::{calc_clock_divider, SUPPORTED_OVERSAMPLING};

/// DMA request line for PIO0 SM0 RX
const DREQ_PIO0_RX0: u8 = 4;

/// Transfer count with MODE = ENDLESS: the channel never completes
const ENDLESS_TRANS_COUNT: u32 = 0xF000_0000;

/// Byte offset of the received byte within the RX FIFO word
const RX_BYTE_LANE: u32 = 3;

/// Capture errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureError {
    /// No receive program for this oversampling factor
    UnsupportedOversampling(u8),
}

#[repr(C, align(32768))]
struct RingStorage(UnsafeCell<[u8; RING_CAPACITY]>);

// Written only by the DMA engine, read with volatile loads.
unsafe impl Sync for RingStorage {}

static RING: RingStorage = RingStorage(UnsafeCell::new([0; RING_CAPACITY]));

fn ring_base() -> *mut u8 {
    RING.0.get().cast()
}

/// Serial byte capture into the DMA ring
pub struct PioCapture<'d, C: Channel> {
    sm: StateMachine<'d, PIO0, 0>,
    dma: Peri<'d, C>,
    rx_pin: Pin<'d, PIO0>,
    program_8x: LoadedProgram<'d, PIO0>,
    program_4x: LoadedProgram<'d, PIO0>,
    running: bool,
}

impl<'d, C: Channel> PioCapture<'d, C> {
    /// Load both receive programs and claim the state machine and DMA channel
    ///
    /// Capture stays halted until [`CaptureControl::start`].
    pub fn new<P: PioPin>(
        common: &mut Common<'d, PIO0>,
        mut sm: StateMachine<'d, PIO0, 0>,
        rx_pin: Peri<'d, P>,
        dma: Peri<'d, C>,
    ) -> Self {
        // 8 cycles per bit; start bit detection plus 12 cycles lands mid-bit
        let prg_8x = pio::pio_asm!(
            ".wrap_target",
            "start:",
            "wait 0 pin 0",
            "set x, 7 [10]",
            "bitloop:",
            "in pins, 1",
            "jmp x-- bitloop [6]",
            "jmp pin good_stop",
            "wait 1 pin 0", // framing error or break: drop the byte
            "jmp start",
            "good_stop:",
            "push",
            ".wrap"
        );

        // 4 cycles per bit; 6 cycles to the middle of the first data bit
        let prg_4x = pio::pio_asm!(
            ".wrap_target",
            "start:",
            "wait 0 pin 0",
            "set x, 7 [4]",
            "bitloop:",
            "in pins, 1",
            "jmp x-- bitloop [2]",
            "jmp pin good_stop",
            "wait 1 pin 0",
            "jmp start",
            "good_stop:",
            "push",
            ".wrap"
        );

        let program_8x = common.load_program(&prg_8x.program);
        let program_4x = common.load_program(&prg_4x.program);
        let rx_pin = common.make_pio_pin(rx_pin);

        sm.set_enable(false);
        sm.set_pin_dirs(PioDirection::In, &[&rx_pin]);

        Self {
            sm,
            dma,
            rx_pin,
            program_8x,
            program_4x,
            running: false,
        }
    }

    fn configure_receiver(&mut self, settings: LineSettings) -> Result<(), CaptureError> {
        if !SUPPORTED_OVERSAMPLING.contains(&settings.oversampling) {
            return Err(CaptureError::UnsupportedOversampling(settings.oversampling));
        }
        let program = if settings.oversampling == 8 {
            &self.program_8x
        } else {
            &self.program_4x
        };

        let mut cfg = Config::default();
        cfg.use_program(program, &[]);
        cfg.set_in_pins(&[&self.rx_pin]);
        cfg.set_jmp_pin(&self.rx_pin);
        // LSB first; after 8 shifts the byte sits in ISR bits 31..24
        cfg.shift_in = ShiftConfig {
            auto_fill: false,
            threshold: 32,
            direction: ShiftDirection::Right,
        };
        cfg.fifo_join = FifoJoin::RxOnly;

        let (int_div, frac_div) = calc_clock_divider(settings.baud, settings.oversampling);
        let divider_bits = ((int_div as u32) << 8) | (frac_div as u32);
        cfg.clock_divider = U24F8::from_bits(divider_bits);

        self.sm.set_config(&cfg);
        self.sm.set_pin_dirs(PioDirection::In, &[&self.rx_pin]);
        Ok(())
    }

    fn clear_ring(&mut self) {
        let base = ring_base();
        for i in 0..RING_CAPACITY {
            // SAFETY: DMA is stopped; index is within the ring
            unsafe { base.add(i).write_volatile(0) };
        }
    }

    fn start_dma(&mut self) {
        let ch = self.dma.regs();
        let rx_fifo = pac::PIO0.rxf(0).as_ptr() as u32 + RX_BYTE_LANE;

        ch.read_addr().write_value(rx_fifo);
        ch.write_addr().write_value(ring_base() as u32);
        ch.trans_count().write(|w| w.0 = ENDLESS_TRANS_COUNT);

        compiler_fence(Ordering::SeqCst);

        let number = self.dma.number();
        ch.ctrl_trig().write(|w| {
            w.set_data_size(pac::dma::vals::DataSize::SIZE_BYTE);
            w.set_incr_read(false);
            w.set_incr_write(true);
            w.set_ring_sel(true);
            w.set_ring_size(RING_BITS as u8);
            w.set_treq_sel(pac::dma::vals::TreqSel::from(DREQ_PIO0_RX0));
            w.set_chain_to(number);
            w.set_irq_quiet(true);
            w.set_en(true);
        });

        compiler_fence(Ordering::SeqCst);
    }

    fn stop_dma(&mut self) {
        let mask = 1u32 << self.dma.number();
        pac::DMA.chan_abort().write(|w| w.0 = mask);
        while pac::DMA.chan_abort().read().0 & mask != 0 {}
        self.dma.regs().ctrl_trig().modify(|w| w.set_en(false));
    }
}

impl<'d, C: Channel> CaptureControl for PioCapture<'d, C> {
    type Error = CaptureError;

    fn halt(&mut self) {
        self.sm.set_enable(false);
        self.stop_dma();
        self.sm.clear_fifos();
        self.running = false;
    }

    fn start(&mut self, settings: LineSettings) -> Result<(), CaptureError> {
        if self.running {
            self.halt();
        }
        self.configure_receiver(settings)?;
        self.clear_ring();
        self.sm.clear_fifos();
        self.sm.restart();
        self.start_dma();
        self.sm.set_enable(true);
        self.running = true;
        Ok(())
    }
}

impl<'d, C: Channel> ByteSource for PioCapture<'d, C> {
    fn capacity(&self) -> usize {
        RING_CAPACITY
    }

    fn producer_position(&self) -> usize {
        let write_addr = self.dma.regs().write_addr().read() as usize;
        write_addr.wrapping_sub(ring_base() as usize) & (RING_CAPACITY - 1)
    }

    fn byte_at(&self, index: usize) -> u8 {
        // SAFETY: index is masked into the ring; the DMA engine only ever
        // writes whole bytes, so a volatile load observes either value.
        unsafe { ring_base().add(index & (RING_CAPACITY - 1)).read_volatile() }
    }
}
