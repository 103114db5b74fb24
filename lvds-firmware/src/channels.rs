//! Inter-task communication channels
//!
//! The bridge task owns all capture and framing state. USB tasks talk to it
//! only through these statics.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use portable_atomic::AtomicBool;

use lvds_hal_rp2350::TxPipe;
use lvds_protocol::HostCommand;

/// Channel capacity for host commands
const COMMAND_CHANNEL_SIZE: usize = 8;

/// Decoded single-byte commands from the host
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, HostCommand, COMMAND_CHANNEL_SIZE> =
    Channel::new();

/// Frame and reply bytes on their way to the USB endpoint
pub static TX_PIPE: TxPipe = TxPipe::new();

/// Host has the port open (DTR asserted)
pub static HOST_CONNECTED: AtomicBool = AtomicBool::new(false);

/// Host opened the port since the bridge last looked
pub static HOST_ATTACHED: Signal<CriticalSectionRawMutex, ()> = Signal::new();
