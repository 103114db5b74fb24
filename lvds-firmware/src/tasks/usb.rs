//! USB CDC tasks
//!
//! - `usb_device_task` runs the device state machine
//! - `usb_tx_task` forwards the TX pipe to the bulk-IN endpoint
//! - `usb_rx_task` decodes command bytes and tracks DTR

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_usb::class::cdc_acm::{ControlChanged, Receiver, Sender};
use embassy_usb::UsbDevice;
use portable_atomic::Ordering;

use lvds_hal_rp2350::forward_to_host;
use lvds_hal_rp2350::usb::MAX_PACKET_SIZE;
use lvds_protocol::HostCommand;

use crate::channels::{COMMAND_CHANNEL, HOST_ATTACHED, HOST_CONNECTED, TX_PIPE};

type UsbDriver = Driver<'static, USB>;

/// USB device task - services enumeration and control requests
#[embassy_executor::task]
pub async fn usb_device_task(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    device.run().await
}

/// USB TX task - drains the pipe while the endpoint is configured
#[embassy_executor::task]
pub async fn usb_tx_task(mut sender: Sender<'static, UsbDriver>) {
    info!("USB TX task started");

    loop {
        sender.wait_connection().await;
        debug!("USB IN endpoint enabled");

        if let Err(e) = forward_to_host(&mut sender, &TX_PIPE).await {
            debug!("USB IN endpoint stopped: {:?}", e);
        }

        // Whatever is left belongs to a session that is gone
        TX_PIPE.clear();
    }
}

/// USB RX task - host command bytes and port open/close
#[embassy_executor::task]
pub async fn usb_rx_task(mut receiver: Receiver<'static, UsbDriver>, control: ControlChanged<'static>) {
    info!("USB RX task started");

    let mut buf = [0u8; MAX_PACKET_SIZE];
    let mut attached = false;

    loop {
        receiver.wait_connection().await;

        loop {
            match select(receiver.read_packet(&mut buf), control.control_changed()).await {
                Either::First(Ok(n)) => {
                    for &byte in &buf[..n] {
                        dispatch(byte);
                    }
                }
                Either::First(Err(e)) => {
                    debug!("USB OUT endpoint stopped: {:?}", e);
                    break;
                }
                Either::Second(()) => {}
            }
            attached = track_dtr(attached, receiver.dtr());
        }

        attached = track_dtr(attached, false);
    }
}

fn dispatch(byte: u8) {
    match HostCommand::from_byte(byte) {
        Some(command) => {
            if COMMAND_CHANNEL.try_send(command).is_err() {
                warn!("Command channel full, dropping {:?}", command);
            }
        }
        None => trace!("Ignoring byte {:#04x}", byte),
    }
}

/// Publish DTR edges to the bridge task
fn track_dtr(was_attached: bool, dtr: bool) -> bool {
    if dtr && !was_attached {
        info!("Host opened the port");
        TX_PIPE.clear();
        HOST_CONNECTED.store(true, Ordering::Release);
        HOST_ATTACHED.signal(());
    } else if !dtr && was_attached {
        info!("Host closed the port");
        HOST_CONNECTED.store(false, Ordering::Release);
    }
    dtr
}
