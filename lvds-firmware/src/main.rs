//! LVDS Bridge - panel capture firmware
//!
//! Main firmware binary for RP2350-based boards. Receives the serial line
//! stream a panel controller sends to its LVDS display, reassembles the
//! scan lines into frames and streams them to a host over USB CDC.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::block::ImageDef;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{PIO0, USB};
use embassy_rp::pio::{self, Pio};
use embassy_rp::usb::{self, Driver};
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::Builder;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use lvds_core::BridgeController;
use lvds_hal_rp2350::usb::MAX_PACKET_SIZE;
use lvds_hal_rp2350::PioCapture;

use crate::config::load_config;
use crate::tasks::bridge::StatusLed;

mod channels;
mod config;
mod tasks;

/// Boot block for the RP2350 boot ROM
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => usb::InterruptHandler<USB>;
    PIO0_IRQ_0 => pio::InterruptHandler<PIO0>;
});

/// Raspberry Pi vendor ID
const USB_VID: u16 = 0x2E8A;

/// CDC serial product ID
const USB_PID: u16 = 0x000A;

// Static cells for USB descriptors and state (must live forever)
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static CDC_STATE: StaticCell<State<'static>> = StaticCell::new();

// Bridge state is ~60 KiB; keep it out of the task future
static BRIDGE: StaticCell<BridgeController> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("LVDS bridge firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();

    // Capture: PIO0 SM0 receives, DMA channel 0 fills the ring
    let Pio {
        mut common, sm0, ..
    } = Pio::new(p.PIO0, Irqs);

    let capture = match config.capture_pin {
        2 => PioCapture::new(&mut common, sm0, p.PIN_2, p.DMA_CH0),
        3 => PioCapture::new(&mut common, sm0, p.PIN_3, p.DMA_CH0),
        other => {
            warn!("Capture pin GPIO{} not supported, using GPIO2", other);
            PioCapture::new(&mut common, sm0, p.PIN_2, p.DMA_CH0)
        }
    };
    info!("PIO capture initialized");

    let led_off = Level::from(config.led.inverted);
    let led_pin = match config.led.pin {
        25 => Output::new(p.PIN_25, led_off),
        15 => Output::new(p.PIN_15, led_off),
        16 => Output::new(p.PIN_16, led_off),
        other => {
            warn!("LED pin GPIO{} not supported, using GPIO25", other);
            Output::new(p.PIN_25, led_off)
        }
    };
    let led = StatusLed {
        pin: led_pin,
        inverted: config.led.inverted,
    };

    // USB CDC ACM
    let driver = Driver::new(p.USB, Irqs);

    let mut usb_config = embassy_usb::Config::new(USB_VID, USB_PID);
    usb_config.manufacturer = Some("LVDS Bridge");
    usb_config.product = Some("LVDS Panel Capture");
    usb_config.serial_number = Some("00000001");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [], // no msos descriptors
        CONTROL_BUF.init([0; 64]),
    );

    let class = CdcAcmClass::new(&mut builder, CDC_STATE.init(State::new()), MAX_PACKET_SIZE as u16);
    let device = builder.build();
    let (sender, receiver, control) = class.split_with_control();
    info!("USB CDC initialized");

    let bridge = match BridgeController::new(config) {
        Ok(bridge) => BRIDGE.init(bridge),
        Err(e) => defmt::panic!("Invalid bridge configuration: {:?}", e),
    };

    // Spawn tasks
    spawner.spawn(tasks::usb_device_task(device)).unwrap();
    spawner.spawn(tasks::usb_tx_task(sender)).unwrap();
    spawner.spawn(tasks::usb_rx_task(receiver, control)).unwrap();
    spawner.spawn(tasks::bridge_task(bridge, capture, led)).unwrap();

    info!("All tasks spawned, firmware running");
}
