//! Status LED pattern
//!
//! Off while no host is attached, solid once frames flow, blinking while a
//! host is attached but nothing has been sent yet.

/// Blink half-period in milliseconds
pub const BLINK_HALF_PERIOD_MS: u64 = 250;

#[derive(Debug, Clone, Default)]
pub struct StatusIndicator {
    lit: bool,
    last_toggle_ms: u64,
}

impl StatusIndicator {
    pub const fn new() -> Self {
        Self {
            lit: false,
            last_toggle_ms: 0,
        }
    }

    /// Compute the LED level for the current time
    pub fn update(&mut self, now_ms: u64, host_attached: bool, frames_sent: u32) -> bool {
        if !host_attached {
            self.lit = false;
        } else if frames_sent > 0 {
            self.lit = true;
        } else if now_ms.wrapping_sub(self.last_toggle_ms) >= BLINK_HALF_PERIOD_MS {
            self.lit = !self.lit;
            self.last_toggle_ms = now_ms;
        }
        self.lit
    }
}
