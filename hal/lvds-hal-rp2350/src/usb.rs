//! USB CDC output channel
//!
//! The bridge loop never awaits the USB endpoint. It writes into a byte pipe
//! with `try_write`, and a separate task forwards the pipe to the CDC bulk-IN
//! endpoint in max-size packets. Free pipe space is the channel capacity.

use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use embassy_usb::class::cdc_acm::Sender;
use embassy_usb::driver::EndpointError;
use portable_atomic::{AtomicBool, Ordering};

use embassy_rp::peripherals::USB;
use lvds_core::traits::OutputChannel;

/// Bytes buffered between the sender and the USB endpoint
pub const TX_PIPE_SIZE: usize = 4096;

/// Full-speed bulk packet size
pub const MAX_PACKET_SIZE: usize = 64;

/// Byte pipe from the bridge loop to the USB endpoint task
pub type TxPipe = Pipe<CriticalSectionRawMutex, TX_PIPE_SIZE>;

/// Non-blocking host channel over the TX pipe
pub struct UsbChannel {
    pipe: &'static TxPipe,
    connected: &'static AtomicBool,
}

impl UsbChannel {
    pub fn new(pipe: &'static TxPipe, connected: &'static AtomicBool) -> Self {
        Self { pipe, connected }
    }
}

impl OutputChannel for UsbChannel {
    fn available_capacity(&self) -> usize {
        self.pipe.free_capacity()
    }

    fn write(&mut self, bytes: &[u8]) -> usize {
        self.pipe.try_write(bytes).unwrap_or(0)
    }

    fn flush(&mut self) {
        // The endpoint task drains the pipe as soon as bytes arrive
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

/// Forward pipe contents to the CDC endpoint until the host goes away
///
/// A zero-length packet terminates a transfer that ended on a packet
/// boundary so the host read completes.
pub async fn forward_to_host(
    sender: &mut Sender<'static, Driver<'static, USB>>,
    pipe: &TxPipe,
) -> Result<(), EndpointError> {
    let mut packet = [0u8; MAX_PACKET_SIZE];
    loop {
        let n = pipe.read(&mut packet).await;
        sender.write_packet(&packet[..n]).await?;
        if n == MAX_PACKET_SIZE && pipe.is_empty() {
            sender.write_packet(&[]).await?;
        }
    }
}
