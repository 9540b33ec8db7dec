//! Room-scoped view of the shared real-time connection.

pub mod channel;
pub mod envelope;
pub mod events;
pub mod memory;
pub mod transport;
pub mod websocket;

pub use channel::RealtimeChannel;
pub use envelope::{open_payload, NoDecryption, PayloadDecryptor, SealedPayload};
pub use events::{
    decode_inbound, inbound, outbound, ActionCompletion, AttachMode, ExceptionPayload,
    InboundEvent,
};
pub use memory::InMemoryChannel;
pub use transport::{ChannelError, ChannelFrame, EventChannel};
pub use websocket::{WebSocketChannel, WebSocketConfig};
