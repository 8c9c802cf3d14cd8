// Transport boundary, pairing handshake and in-process hub.

pub mod events;
pub mod handshake;
pub mod hub;
pub mod transport;

pub use events::{event_channel, EventReceiver, EventSender, NetEvent};
pub use handshake::{HandshakeError, HandshakeState, PairingHandshake};
pub use hub::{MemoryHub, MemoryTransport};
pub use transport::{MessageKind, ReversePairingInfo, Transport, TransportError};
