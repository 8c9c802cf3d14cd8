//! Typed notifications from the transport layer.
//!
//! The transport delivers asynchronous signals on a bounded mpsc channel
//! instead of a global event bus: the core registers one receiver at
//! startup and reacts to events as they arrive.

use tokio::sync::mpsc;

use pairline_shared::constants::KEY_SIZE;
use pairline_shared::DeviceAddress;

/// Signals raised by the transport collaborator.
#[derive(Debug, Clone)]
pub enum NetEvent {
    /// The handshake with this correspondent fully confirmed in both
    /// directions. Raised once per pairing.
    Paired { address: DeviceAddress },
    /// An inbound text message.
    TextReceived { from: DeviceAddress, text: String },
    /// The transport rotated the temporary keys; the new pair must be
    /// persisted alongside the unchanged permanent key.
    TempKeysRotated {
        temp: [u8; KEY_SIZE],
        prev_temp: [u8; KEY_SIZE],
    },
}

pub type EventSender = mpsc::Sender<NetEvent>;
pub type EventReceiver = mpsc::Receiver<NetEvent>;

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}
