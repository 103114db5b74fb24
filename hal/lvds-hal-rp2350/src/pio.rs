//! PIO serial receiver timing
//!
//! The panel stream is received by an oversampling UART-RX program. Each
//! received bit spans `oversampling` PIO cycles, so the state machine clock
//! must run at `baud * oversampling`.

/// System clock frequency (RP2350 default)
pub const SYS_CLK_HZ: u32 = 150_000_000;

/// PIO cycles per bit supported by the receive programs
pub const SUPPORTED_OVERSAMPLING: [u8; 2] = [8, 4];

/// Calculate the clock divider for a bit rate and oversampling factor
///
/// The PIO program runs at SYS_CLK / divider Hz and samples each bit
/// `oversampling` times, so: divider = SYS_CLK / (baud * oversampling)
///
/// Returns (integer_part, fractional_part) for the 16.8 fixed-point divider.
pub fn calc_clock_divider(baud: u32, oversampling: u8) -> (u16, u8) {
    let sample_rate = baud as u64 * oversampling as u64;
    if sample_rate == 0 {
        return (0xFFFF, 0xFF);
    }

    // Round to the nearest 1/256 step
    let divider_x256 = (SYS_CLK_HZ as u64 * 256 + sample_rate / 2) / sample_rate;

    // The hardware cannot divide below 1
    let divider_x256 = divider_x256.clamp(256, 0xFFFF_FF);

    let int_part = (divider_x256 / 256) as u16;
    let frac_part = (divider_x256 % 256) as u8;
    (int_part, frac_part)
}

/// Actual sample rate produced by a divider, in Hz
pub fn effective_sample_rate(int_part: u16, frac_part: u8) -> u32 {
    let divider_x256 = ((int_part as u64) << 8) | frac_part as u64;
    ((SYS_CLK_HZ as u64 * 256) / divider_x256) as u32
}
