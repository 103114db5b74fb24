//! Bridge task
//!
//! Single cooperative loop over the bridge controller: apply host commands,
//! parse a bounded batch of captured bytes, push output to the USB pipe,
//! update the status LED, yield. Nothing in the loop awaits the host.

use defmt::*;
use embassy_futures::yield_now;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::DMA_CH0;
use embassy_time::{Duration, Instant, Timer};
use portable_atomic::Ordering;

use lvds_core::indicator::StatusIndicator;
use lvds_core::{BridgeController, CaptureReport, CommandOutcome};
use lvds_hal_rp2350::{PioCapture, UsbChannel};

use crate::channels::{COMMAND_CHANNEL, HOST_ATTACHED, HOST_CONNECTED, TX_PIPE};

/// Interval between periodic counter logs
const STATS_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Time allowed for the bootloader acknowledgement to reach the host
const BOOT_ACK_TIMEOUT: Duration = Duration::from_millis(100);

/// Delay before the ROM reboots into BOOTSEL
const BOOTSEL_REBOOT_DELAY_MS: u32 = 50;

/// Boot ROM reboot type: BOOTSEL (USB mass storage / PICOBOOT)
const REBOOT_TYPE_BOOTSEL: u32 = 0x0002;

/// Status LED with its polarity
pub struct StatusLed {
    pub pin: Output<'static>,
    pub inverted: bool,
}

impl StatusLed {
    fn set(&mut self, lit: bool) {
        self.pin.set_level(Level::from(lit != self.inverted));
    }
}

/// Bridge task - owns capture, parser, assembler and sender
#[embassy_executor::task]
pub async fn bridge_task(
    bridge: &'static mut BridgeController,
    mut capture: PioCapture<'static, DMA_CH0>,
    mut led: StatusLed,
) {
    info!("Bridge task started");

    match bridge.start(&mut capture) {
        Ok(()) => info!(
            "Capturing {} at {} baud",
            bridge.variant().name(),
            bridge.descriptor().baud
        ),
        Err(e) => error!("Failed to start capture: {:?}", e),
    }

    let mut channel = UsbChannel::new(&TX_PIPE, &HOST_CONNECTED);
    let mut indicator = StatusIndicator::new();
    let boot = Instant::now();
    let mut next_stats_log = boot + STATS_LOG_INTERVAL;

    loop {
        if HOST_ATTACHED.try_take().is_some() {
            info!("Host attached, session counters reset");
            bridge.host_attached();
        }

        while let Ok(command) = COMMAND_CHANNEL.try_receive() {
            debug!("Host command: {:?}", command);
            match bridge.handle_command(command, &mut capture) {
                Ok(CommandOutcome::Continue) => {}
                Ok(CommandOutcome::EnterBootloader) => {
                    enter_bootloader(bridge, &mut channel, &mut led).await;
                }
                Err(e) => error!("Failed to restart capture: {:?}", e),
            }
        }

        let report = bridge.poll_capture(&capture);
        log_capture(&report);

        bridge.poll_sender(&mut channel);

        let now = Instant::now();
        let attached = HOST_CONNECTED.load(Ordering::Acquire);
        let lit = indicator.update(
            now.duration_since(boot).as_millis(),
            attached,
            bridge.stats().frames_sent,
        );
        led.set(lit);

        if now >= next_stats_log {
            next_stats_log = now + STATS_LOG_INTERVAL;
            let stats = bridge.stats();
            debug!(
                "sent={} drop={} crc_ok={} crc_err={} resync={} maxfill={}",
                stats.frames_sent,
                stats.frames_dropped,
                stats.crc_ok,
                stats.crc_errors,
                stats.resyncs,
                stats.peak_fill
            );
        }

        yield_now().await;
    }
}

fn log_capture(report: &CaptureReport) {
    if report.overrun {
        warn!(
            "Ring overrun: {} bytes behind the producer",
            report.fill
        );
    }
    if report.resyncs > 0 {
        debug!("Lost line alignment {} times", report.resyncs);
    }
    if report.frames_completed > 0 || report.frames_dropped > 0 {
        trace!(
            "Parsed {} bytes: {} lines, {} frames, {} dropped",
            report.consumed,
            report.lines_valid,
            report.frames_completed,
            report.frames_dropped
        );
    }
}

/// Flush the acknowledgement, then hand the chip to the boot ROM
async fn enter_bootloader(
    bridge: &mut BridgeController,
    channel: &mut UsbChannel,
    led: &mut StatusLed,
) -> ! {
    info!("Entering bootloader");
    led.set(false);

    let deadline = Instant::now() + BOOT_ACK_TIMEOUT;
    while bridge.output_pending() && Instant::now() < deadline {
        bridge.poll_sender(channel);
        yield_now().await;
    }
    while !TX_PIPE.is_empty() && Instant::now() < deadline {
        Timer::after_millis(1).await;
    }

    // SAFETY: the ROM reboot entry point does not return once the reboot
    // is scheduled. Capture is halted and no DMA targets RAM.
    unsafe {
        embassy_rp::rom_data::reboot(REBOOT_TYPE_BOOTSEL, BOOTSEL_REBOOT_DELAY_MS, 0, 0);
    }

    loop {
        Timer::after_secs(1).await;
    }
}
